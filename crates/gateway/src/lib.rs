//! Gateway: HTTP surface, request-gating pipeline, rate limiting.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Construct engine, webhook bridge, guard chains
//! 3. Bind address, start HTTP server
//! 4. Every inbound request runs the ordered guard pipeline before any
//!    handler; handlers stay thin and delegate to the session engine
//!
//! Session protocol logic lives behind the `SessionEngine` trait in
//! `chatwire-sessions`; event delivery lives in `chatwire-webhooks`.

pub mod error;
pub mod guard;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;
