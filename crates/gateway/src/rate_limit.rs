use std::time::Duration;

use {dashmap::DashMap, tokio::time::Instant};

use crate::error::ApiError;

/// Fixed-window admission counter keyed by client identity (remote IP
/// by default).
///
/// One window per key: the first request in a window stamps its start,
/// each admitted request increments the counter, and once `window` has
/// elapsed the next request rolls the counter back to zero. All
/// mutation happens under the per-entry dashmap lock, which is never
/// held across an await. Counters are process-local and die with the
/// process.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    message: String,
    windows: DashMap<String, Window>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration, message: impl Into<String>) -> Self {
        Self {
            max,
            window,
            message: message.into(),
            windows: DashMap::new(),
        }
    }

    /// Admit or reject one request from `key`.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;
        if entry.count > self.max {
            return Err(ApiError::RateLimited(self.message.clone()));
        }
        Ok(())
    }

    /// Evict windows idle for two full window lengths. Affects memory
    /// footprint only; `check` rolls stale windows itself.
    pub fn sweep(&self) {
        let now = Instant::now();
        let cutoff = self.window * 2;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < cutoff);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_request_in_window_is_rejected() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1000), "blocked");

        assert!(limiter.check("1.2.3.4").is_ok());
        assert_eq!(
            limiter.check("1.2.3.4"),
            Err(ApiError::RateLimited("blocked".into()))
        );

        // A fresh window admits again.
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(limiter.check("1.2.3.4").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_isolated() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1000), "blocked");
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("5.6.7.8").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rejections_stop_at_window_rollover() {
        let limiter = RateLimiter::new(2, Duration::from_millis(500), "blocked");
        assert!(limiter.check("k").is_ok());
        assert!(limiter.check("k").is_ok());
        assert!(limiter.check("k").is_err());

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(limiter.check("k").is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.check("k").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_idle_windows_only() {
        let limiter = RateLimiter::new(10, Duration::from_millis(1000), "blocked");
        assert!(limiter.check("old").is_ok());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(limiter.check("fresh").is_ok());
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 1);

        tokio::time::advance(Duration::from_millis(2000)).await;
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
