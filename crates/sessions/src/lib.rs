//! Session identity and the engine seam.
//!
//! A session is one externally-managed chat-network connection, named by
//! an opaque id. The protocol client itself is out of scope here; the
//! gateway reaches it through the [`SessionEngine`] trait and receives
//! its events through [`EventSink`].

pub mod engine;
pub mod id;

pub use {
    engine::{
        EngineError, EventSink, InMemoryEngine, SessionEngine, SessionEvent, SessionSnapshot,
        SessionState, SessionValidation,
    },
    id::{SessionId, SessionIdError},
};
