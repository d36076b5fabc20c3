//! Config schema types (gateway, rate limiting, webhooks).
//!
//! The loaded value is immutable after startup: it is constructed once
//! and passed by reference into every component constructor.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatwireConfig {
    pub gateway: GatewayConfig,
    pub rate_limit: RateLimitConfig,
    pub webhooks: WebhookConfig,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,

    /// Shared secret checked against the `access-token` header and used
    /// to sign outbound webhooks.
    ///
    /// Absent (or empty) disables BOTH: every request passes the key
    /// guard and webhooks go out unsigned. This fail-open default keeps
    /// first-run setups working; production deployments should always
    /// set a key. The server logs a warning at startup when running
    /// open.
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8747,
            api_key: None,
        }
    }
}

/// Per-client request admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per window, per client key.
    pub max: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Body of the 429 rejection.
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: 1000,
            window_ms: 1000,
            message: "You can't make any more requests at the moment. Try again later".into(),
        }
    }
}

/// Outbound event delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Base callback URL. Absent disables delivery entirely.
    pub base_url: Option<String>,

    /// Event names that must never be delivered. `None` means no list
    /// was loaded, which is distinct from an explicit empty list — see
    /// [`GatePolicy`].
    pub disabled_events: Option<Vec<String>>,

    /// What the gate does when no deny-list was loaded.
    pub gate_policy: GatePolicy,
}

/// Gate behavior when `disabled_events` is absent.
///
/// `Open` forwards every event (the historical behavior); `Closed`
/// suppresses everything until a list is configured. With a loaded list
/// the policy is irrelevant: listed names are suppressed, the rest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    #[default]
    Open,
    Closed,
}
