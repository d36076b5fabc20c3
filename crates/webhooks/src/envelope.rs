use serde::Serialize;

use chatwire_common::types::EventKind;

/// One outbound notification: `{ "sessionId": …, "event": …, "data": … }`.
///
/// Built fresh per dispatch call and never mutated afterwards. The wire
/// bytes are produced exactly once per delivery attempt; the signature
/// covers exactly those bytes.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub event: EventKind,
    pub data: serde_json::Value,
}

impl WebhookEnvelope {
    pub fn new(
        session_id: impl Into<String>,
        event: EventKind,
        data: serde_json::Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            event,
            data,
        }
    }

    /// Canonical wire bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
