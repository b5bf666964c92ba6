//! Per-worker request pacing

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::time::Duration;

/// Token bucket limiting how often one worker may call the target
///
/// Every request attempt, retries included, takes one token.
pub struct RequestRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_limit: Option<f64>,
}

impl RequestRateLimiter {
    /// Create a limiter for `rate_limit` requests per second
    ///
    /// `None`, zero, negative or non-finite rates disable limiting. Rates
    /// below one request per second are honoured through the replenish period.
    ///
    /// ```
    /// use osbench_core::worker::RequestRateLimiter;
    ///
    /// assert!(RequestRateLimiter::new(Some(0.5)).is_enabled());
    /// assert!(!RequestRateLimiter::new(None).is_enabled());
    /// ```
    pub fn new(rate_limit: Option<f64>) -> Self {
        let limiter = rate_limit
            .filter(|rps| *rps > 0.0 && rps.is_finite())
            .and_then(|rps| Quota::with_period(Duration::from_secs_f64(1.0 / rps)))
            .map(RateLimiter::direct);

        Self {
            limiter,
            rate_limit,
        }
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Whether a rate is being enforced
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured requests per second
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for RequestRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRateLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
