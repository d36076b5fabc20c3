//! Wire shapes shared across the HTTP surface and the webhook envelope.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Response bodies ──────────────────────────────────────────────────────────

/// Body of every rejected request: `{ "success": false, "error": "<why>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body of a plain success response: `{ "success": true, "message": "…" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ── Event kinds ──────────────────────────────────────────────────────────────

/// Session event names, shared by convention between the session engine
/// and the webhook gate.
///
/// The set is open: names outside the known variants round-trip through
/// [`EventKind::Other`] unchanged, so engines can grow new events without
/// touching this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A pairing QR code became available.
    Qr,
    /// An inbound chat message arrived.
    Message,
    /// The session's connection state changed.
    StateChange,
    /// Any other event name.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Qr => "qr",
            Self::Message => "message",
            Self::StateChange => "state_change",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "qr" => Self::Qr,
            "message" => Self::Message,
            "state_change" => Self::StateChange,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}
