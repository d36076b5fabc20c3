use std::time::Duration;

use {
    hmac::{Hmac, Mac},
    reqwest::header::CONTENT_TYPE,
    serde::ser::{Serialize, SerializeStruct, Serializer},
    sha2::Sha256,
    tracing::{debug, warn},
};

use chatwire_common::types::EventKind;

use crate::envelope::WebhookEnvelope;

type HmacSha256 = Hmac<Sha256>;

/// Per-delivery budget. Slower receivers count as failed.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Chatwire/1.0";

/// Header carrying `sha256=<hex-digest>` of the request body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

// ── Outcome ──────────────────────────────────────────────────────────────────

/// Result of one delivery attempt, always returned as data.
///
/// Non-2xx statuses, timeouts, DNS and connect errors all collapse into
/// `Failed`; the caller decides whether to retry, log, or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        status: u16,
        body: serde_json::Value,
    },
    Failed {
        error: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Delivered { .. } => None,
        }
    }
}

// Serializes to `{"success":true,"body":…}` / `{"success":false,"error":…}`.
impl Serialize for DeliveryOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Delivered { body, .. } => {
                let mut s = serializer.serialize_struct("DeliveryOutcome", 2)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("body", body)?;
                s.end()
            },
            Self::Failed { error } => {
                let mut s = serializer.serialize_struct("DeliveryOutcome", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("error", error)?;
                s.end()
            },
        }
    }
}

// ── Signing ──────────────────────────────────────────────────────────────────

/// Hex HMAC-SHA-256 digest of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length; this arm is unreachable.
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

/// Builds, signs, and sends a single outbound notification.
///
/// One shared client, fixed timeout, no retries — latency stays bounded
/// and predictable, and `deliver` can never raise into the session flow
/// that called it.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    secret: Option<String>,
}

impl WebhookDispatcher {
    /// `secret` enables the signature header; `None` sends unsigned
    /// payloads, which receivers must treat as untrusted.
    pub fn new(secret: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            secret: secret.filter(|s| !s.is_empty()),
        })
    }

    /// Deliver one event to `target_url`.
    ///
    /// The session id is appended as a path segment unless the URL
    /// already contains it. The envelope is serialized once; when a
    /// secret is configured the signature covers exactly those bytes.
    pub async fn deliver(
        &self,
        target_url: &str,
        session_id: &str,
        event: EventKind,
        data: serde_json::Value,
    ) -> DeliveryOutcome {
        let url = if target_url.contains(session_id) {
            target_url.to_string()
        } else {
            format!("{target_url}/{session_id}")
        };

        let envelope = WebhookEnvelope::new(session_id, event, data);
        let body = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                return DeliveryOutcome::Failed {
                    error: format!("serialize envelope: {e}"),
                };
            },
        };

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, format!("sha256={}", sign(secret, &body)));
        }

        debug!(session_id, event = %envelope.event, url = %url, "delivering webhook");

        match request.body(body).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let body = response
                        .json::<serde_json::Value>()
                        .await
                        .unwrap_or(serde_json::Value::Null);
                    debug!(session_id, event = %envelope.event, status = status.as_u16(), "webhook delivered");
                    DeliveryOutcome::Delivered {
                        status: status.as_u16(),
                        body,
                    }
                } else {
                    warn!(session_id, event = %envelope.event, status = status.as_u16(), "webhook rejected");
                    DeliveryOutcome::Failed {
                        error: format!("webhook failed with status {}", status.as_u16()),
                    }
                }
            },
            Err(e) => {
                warn!(session_id, event = %envelope.event, error = %e, "webhook send failed");
                DeliveryOutcome::Failed {
                    error: e.to_string(),
                }
            },
        }
    }
}
