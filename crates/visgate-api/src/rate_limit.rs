//! Per-`owner_hash` sliding-window rate limit (spec.md §6.1: 100 req/min).
//!
//! A small `Mutex<HashMap<...>>`, the same shape as the teacher's
//! `RemediationTracker` — not worth a `governor`/`dashmap` dependency for
//! a single counter per caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request for `owner_hash`. Returns `Ok(())` if under the
    /// limit, or `Err(retry_after_secs)` if the caller should back off.
    pub fn check(&self, owner_hash: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut hits = self.hits.lock().expect("rate limiter mutex poisoned");
        let entry = hits.entry(owner_hash.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() >= self.limit {
            let oldest = entry.first().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after.as_secs().max(1));
        }

        entry.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("owner-a").is_ok());
        assert!(limiter.check("owner-a").is_ok());
        assert!(limiter.check("owner-a").is_err());
    }

    #[test]
    fn counters_are_independent_per_owner() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("owner-a").is_ok());
        assert!(limiter.check("owner-b").is_ok());
    }
}
