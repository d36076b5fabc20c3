//! Outbound event delivery: deny-list gate, signed envelope, dispatch.
//!
//! The dispatcher turns one internal session event into one outbound
//! HTTP POST — signed when a secret is configured, bounded by a fixed
//! timeout, and with every failure mode returned as data instead of an
//! error. Retry policy, if any, belongs to callers; nothing here may
//! stall or crash the session that produced the event.

pub mod bridge;
pub mod dispatch;
pub mod envelope;
pub mod gate;

pub use {
    bridge::WebhookBridge,
    dispatch::{DeliveryOutcome, SIGNATURE_HEADER, WebhookDispatcher, sign},
    envelope::WebhookEnvelope,
    gate::EventGate,
};
