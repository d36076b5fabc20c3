//! Bounded polling: a read-side bridge from event-driven state to
//! blocking-style callers.
//!
//! A wait is a tiny state machine: it starts pending, then makes exactly
//! one terminal transition — satisfied (the probe yielded a value before
//! the deadline) or timed out (elapsed time exceeded the budget). The
//! cancellable variant adds a third terminal state for callers that need
//! early abandonment; the base waiter runs to completion once started.

use std::time::Duration;

use {
    tokio::time::{Instant, sleep},
    tokio_util::sync::CancellationToken,
};

/// Polling budget for one wait.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Total time the condition may take before the wait fails.
    pub max_wait: Duration,
    /// Pause between probe samples.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(10),
            interval: Duration::from_millis(100),
        }
    }
}

/// Why a wait ended without the condition being met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("timed out waiting for condition")]
    TimedOut,
    #[error("wait cancelled")]
    Cancelled,
}

/// Poll `probe` until it yields a value or the budget runs out.
///
/// The probe is sampled immediately, then once per `interval`; the wait
/// fails once elapsed time exceeds `max_wait` (strictly — a probe that
/// turns true on the deadline itself still wins). The probe must be
/// cheap and non-blocking; it runs on the async worker between sleeps
/// and must never mutate the state it observes.
pub async fn wait_for<T>(
    opts: WaitOptions,
    mut probe: impl FnMut() -> Option<T>,
) -> Result<T, WaitError> {
    let start = Instant::now();
    loop {
        if let Some(value) = probe() {
            return Ok(value);
        }
        if start.elapsed() > opts.max_wait {
            return Err(WaitError::TimedOut);
        }
        sleep(opts.interval).await;
    }
}

/// Boolean convenience wrapper over [`wait_for`].
pub async fn wait_until(
    opts: WaitOptions,
    mut predicate: impl FnMut() -> bool,
) -> Result<(), WaitError> {
    wait_for(opts, || predicate().then_some(())).await
}

/// [`wait_for`] with an explicit cancel handle.
///
/// Identical polling semantics, plus the wait resolves `Cancelled` as
/// soon as `token` fires — including while parked between samples.
pub async fn wait_for_cancellable<T>(
    opts: WaitOptions,
    token: &CancellationToken,
    mut probe: impl FnMut() -> Option<T>,
) -> Result<T, WaitError> {
    let start = Instant::now();
    loop {
        if token.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if let Some(value) = probe() {
            return Ok(value);
        }
        if start.elapsed() > opts.max_wait {
            return Err(WaitError::TimedOut);
        }
        tokio::select! {
            _ = token.cancelled() => return Err(WaitError::Cancelled),
            _ = sleep(opts.interval) => {},
        }
    }
}
