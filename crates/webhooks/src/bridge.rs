use {async_trait::async_trait, tracing::{debug, warn}};

use {
    chatwire_common::types::EventKind,
    chatwire_config::ChatwireConfig,
    chatwire_sessions::{EventSink, SessionEvent},
};

use crate::{
    dispatch::{DeliveryOutcome, WebhookDispatcher},
    gate::EventGate,
};

/// Gate + dispatcher behind the engine's event sink seam.
///
/// This is the one place internal session events become outbound HTTP:
/// the gate filters, the dispatcher delivers, and failures are logged
/// and swallowed so they can never destabilize the originating session.
pub struct WebhookBridge {
    gate: EventGate,
    dispatcher: WebhookDispatcher,
    base_url: Option<String>,
}

impl WebhookBridge {
    /// Wire the bridge from the loaded configuration. The gateway api
    /// key doubles as the webhook signing secret.
    pub fn from_config(config: &ChatwireConfig) -> anyhow::Result<Self> {
        Ok(Self {
            gate: EventGate::new(
                config.webhooks.disabled_events.as_deref(),
                config.webhooks.gate_policy,
            ),
            dispatcher: WebhookDispatcher::new(config.gateway.api_key.clone())?,
            base_url: config.webhooks.base_url.clone(),
        })
    }

    /// Deliver one event if the gate allows it and a base URL is
    /// configured. `None` means the event was suppressed or delivery is
    /// unconfigured; `Some(Failed { .. })` is reported, not raised.
    pub async fn emit(
        &self,
        session_id: &str,
        event: EventKind,
        data: serde_json::Value,
    ) -> Option<DeliveryOutcome> {
        if !self.gate.should_deliver(&event) {
            debug!(session_id, event = %event, "event suppressed by gate");
            return None;
        }
        let base_url = self.base_url.as_deref()?;

        let outcome = self
            .dispatcher
            .deliver(base_url, session_id, event.clone(), data)
            .await;
        if let Some(error) = outcome.error() {
            warn!(session_id, event = %event, error, "webhook delivery failed");
        }
        Some(outcome)
    }
}

#[async_trait]
impl EventSink for WebhookBridge {
    async fn publish(&self, event: SessionEvent) {
        let _ = self
            .emit(event.session_id.as_str(), event.kind, event.data)
            .await;
    }
}
