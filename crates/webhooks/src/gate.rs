use std::collections::HashSet;

use chatwire_common::types::EventKind;
use chatwire_config::GatePolicy;

/// Deny-list filter deciding which event kinds reach the dispatcher.
///
/// Pure and read-only after startup: the answer for a given event name
/// never changes while the process runs. With a loaded list, listed
/// names are suppressed and everything else passes. With no list the
/// configured [`GatePolicy`] decides — `Open` forwards everything,
/// `Closed` forwards nothing.
#[derive(Debug, Clone)]
pub struct EventGate {
    disabled: Option<HashSet<String>>,
    policy: GatePolicy,
}

impl EventGate {
    pub fn new(disabled: Option<&[String]>, policy: GatePolicy) -> Self {
        Self {
            disabled: disabled.map(|names| names.iter().cloned().collect()),
            policy,
        }
    }

    pub fn should_deliver(&self, event: &EventKind) -> bool {
        match &self.disabled {
            Some(list) => !list.contains(event.as_str()),
            None => self.policy == GatePolicy::Open,
        }
    }
}
