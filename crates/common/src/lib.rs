//! Shared wire types and synchronization primitives.
//!
//! Everything here is consumed by at least two workspace crates: the
//! `{success, …}` response body shapes, the open event-name enumeration
//! shared by the session engine and the webhook gate, and the bounded
//! polling waiter that bridges event-driven session state to
//! blocking-style HTTP handlers.

pub mod types;
pub mod wait;

pub use types::{ErrorBody, EventKind, MessageBody};
pub use wait::{WaitError, WaitOptions, wait_for, wait_for_cancellable, wait_until};
