//! The session engine seam.
//!
//! The real chat-network protocol client (connection establishment, QR
//! generation, message codecs) lives outside this workspace. The gateway
//! only ever talks to it through [`SessionEngine`], and the engine pushes
//! events back out through an injected [`EventSink`].

use std::sync::{Arc, Weak};

use {
    async_trait::async_trait,
    dashmap::{DashMap, mapref::entry::Entry},
    serde::Serialize,
    tokio::sync::RwLock,
    tracing::debug,
};

use chatwire_common::types::EventKind;

use crate::id::SessionId;

// ── Types ────────────────────────────────────────────────────────────────────

/// Verdict from the engine's `validate` call. `message` is surfaced
/// verbatim to HTTP callers when `success` is false.
#[derive(Debug, Clone, Serialize)]
pub struct SessionValidation {
    pub success: bool,
    pub message: String,
}

impl SessionValidation {
    pub fn connected() -> Self {
        Self {
            success: true,
            message: "session_connected".into(),
        }
    }

    pub fn not_connected() -> Self {
        Self {
            success: true,
            message: "session_not_connected".into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: false,
            message: "session_not_found".into(),
        }
    }
}

/// Connection lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    QrReady,
    Connected,
    Disconnected,
}

/// Read-side view of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: SessionState,
    pub qr: Option<String>,
}

/// Event emitted by a session, fed to the configured sink.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub kind: EventKind,
    pub data: serde_json::Value,
}

/// Failures the engine reports to its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("session_not_found")]
    NotFound,
}

// ── Seams ────────────────────────────────────────────────────────────────────

/// Where session events go. Implemented by the webhook bridge; tests
/// plug in recording sinks.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: SessionEvent);
}

/// One externally-managed pool of chat-network connections.
#[async_trait]
pub trait SessionEngine: Send + Sync {
    /// Look up a session. `success: false` means unknown id; the message
    /// is what HTTP callers see on a 404.
    async fn validate(&self, id: &str) -> SessionValidation;

    /// Begin connecting a session. Idempotent: starting an id that is
    /// already live is a no-op.
    async fn start(&self, id: &SessionId) -> Result<(), EngineError>;

    /// Tear a session down and forget it.
    async fn terminate(&self, id: &str) -> Result<(), EngineError>;

    /// Current view of one session, if known.
    fn snapshot(&self, id: &str) -> Option<SessionSnapshot>;

    /// Current view of every session.
    fn list(&self) -> Vec<SessionSnapshot>;
}

// ── In-memory engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SessionRecord {
    state: SessionState,
    qr: Option<String>,
}

/// Process-local [`SessionEngine`].
///
/// This is the workspace's stand-in for the out-of-scope protocol
/// client: `start` registers the session, and whoever drives the
/// connection (tests, or the simulated connector) advances it with
/// [`set_qr`](Self::set_qr) / [`set_connected`](Self::set_connected),
/// each advance publishing an event through the configured sink.
pub struct InMemoryEngine {
    sessions: DashMap<String, SessionRecord>,
    /// Late-bound sink (the webhook bridge is constructed after the
    /// engine during startup wiring).
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    /// Handle back to the owning Arc, for tasks spawned from `start`.
    me: Weak<InMemoryEngine>,
    /// When set, `start` spawns a task that issues a generated QR after
    /// this many milliseconds, so the waiter/webhook path is exercisable
    /// without a protocol client.
    simulate_qr_after_ms: Option<u64>,
}

impl InMemoryEngine {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Engine whose sessions produce a generated QR shortly after start.
    pub fn simulated(qr_after_ms: u64) -> Arc<Self> {
        Self::build(Some(qr_after_ms))
    }

    fn build(simulate_qr_after_ms: Option<u64>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            sessions: DashMap::new(),
            sink: RwLock::new(None),
            me: me.clone(),
            simulate_qr_after_ms,
        })
    }

    /// Late-bind the event sink.
    pub async fn set_sink(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write().await = Some(sink);
    }

    async fn publish(&self, session_id: &SessionId, kind: EventKind, data: serde_json::Value) {
        let sink = self.sink.read().await.clone();
        let Some(sink) = sink else {
            debug!(session_id = %session_id, event = %kind, "no sink configured, dropping event");
            return;
        };
        sink.publish(SessionEvent {
            session_id: session_id.clone(),
            kind,
            data,
        })
        .await;
    }

    /// A pairing QR became available for `id`.
    pub async fn set_qr(&self, id: &SessionId, qr: impl Into<String>) -> Result<(), EngineError> {
        let qr = qr.into();
        {
            let mut record = self
                .sessions
                .get_mut(id.as_str())
                .ok_or(EngineError::NotFound)?;
            record.state = SessionState::QrReady;
            record.qr = Some(qr.clone());
        }
        self.publish(id, EventKind::Qr, serde_json::json!({ "qr": qr }))
            .await;
        Ok(())
    }

    /// The session finished pairing and is live.
    pub async fn set_connected(&self, id: &SessionId) -> Result<(), EngineError> {
        {
            let mut record = self
                .sessions
                .get_mut(id.as_str())
                .ok_or(EngineError::NotFound)?;
            record.state = SessionState::Connected;
            record.qr = None;
        }
        self.publish(
            id,
            EventKind::StateChange,
            serde_json::json!({ "state": "connected" }),
        )
        .await;
        Ok(())
    }

    /// Inject an inbound message (test/simulation hook).
    pub async fn push_message(
        &self,
        id: &SessionId,
        payload: serde_json::Value,
    ) -> Result<(), EngineError> {
        if !self.sessions.contains_key(id.as_str()) {
            return Err(EngineError::NotFound);
        }
        self.publish(id, EventKind::Message, payload).await;
        Ok(())
    }
}

#[async_trait]
impl SessionEngine for InMemoryEngine {
    async fn validate(&self, id: &str) -> SessionValidation {
        match self.sessions.get(id).map(|r| r.state) {
            None => SessionValidation::not_found(),
            Some(SessionState::Connected) => SessionValidation::connected(),
            Some(_) => SessionValidation::not_connected(),
        }
    }

    async fn start(&self, id: &SessionId) -> Result<(), EngineError> {
        // Single entry-lock insert so concurrent starts cannot race.
        let fresh = match self.sessions.entry(id.as_str().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(SessionRecord {
                    state: SessionState::Starting,
                    qr: None,
                });
                true
            },
        };
        if fresh {
            self.publish(
                id,
                EventKind::StateChange,
                serde_json::json!({ "state": "starting" }),
            )
            .await;
            if let (Some(delay_ms), Some(engine)) =
                (self.simulate_qr_after_ms, self.me.upgrade())
            {
                let id = id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    let qr = uuid::Uuid::new_v4().to_string();
                    let _ = engine.set_qr(&id, qr).await;
                });
            }
        } else {
            debug!(session_id = %id, "session already started");
        }
        Ok(())
    }

    async fn terminate(&self, id: &str) -> Result<(), EngineError> {
        let (_, _record) = self.sessions.remove(id).ok_or(EngineError::NotFound)?;
        if let Ok(parsed) = SessionId::parse(id) {
            self.publish(
                &parsed,
                EventKind::StateChange,
                serde_json::json!({ "state": "disconnected" }),
            )
            .await;
        }
        Ok(())
    }

    fn snapshot(&self, id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(id).map(|r| SessionSnapshot {
            id: id.to_string(),
            state: r.state,
            qr: r.qr.clone(),
        })
    }

    fn list(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .iter()
            .map(|entry| SessionSnapshot {
                id: entry.key().clone(),
                state: entry.value().state,
                qr: entry.value().qr.clone(),
            })
            .collect()
    }
}
