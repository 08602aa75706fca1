//! Token-bucket request pacing.
//!
//! One pacer per adapter instance. Adapters are shared `Arc`s, so the
//! bucket is shared by every concurrent caller of the same institution,
//! fan-out included.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;

use crate::config::RateLimitPolicy;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Refill rate in tokens per second.
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn new(policy: &RateLimitPolicy) -> Self {
        let capacity = f64::from(policy.burst.max(1));
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: f64::from(policy.effective_per_minute()) / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Request pacer for a single institution.
pub struct RequestPacer {
    bucket: Mutex<TokenBucket>,
}

impl RequestPacer {
    pub fn new(policy: &RateLimitPolicy) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(policy)),
        }
    }

    /// Recover from poison: a slightly wrong pacing decision beats a panic.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait (asynchronously) until a token is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut bucket = self.lock_bucket();
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_available()
            };

            if wait_time > Duration::ZERO {
                debug!("pacer: waiting {wait_time:?} for a request slot");
                tokio::time::sleep(wait_time).await;
            }
        }
    }

    /// Take a token without waiting; false when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(requests_per_minute: u32, burst: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            requests_per_minute,
            requests_per_hour: None,
            burst,
        }
    }

    #[test]
    fn test_burst_then_empty() {
        let pacer = RequestPacer::new(&policy(60, 3));
        assert!(pacer.try_acquire());
        assert!(pacer.try_acquire());
        assert!(pacer.try_acquire());
        assert!(!pacer.try_acquire());
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(&policy(60, 1)); // 1 token/second
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());

        // simulate elapsed time
        bucket.last_update = Instant::now() - Duration::from_secs(2);
        assert!(bucket.try_acquire());
    }

    #[test]
    fn test_hourly_cap_slows_refill() {
        let capped = RateLimitPolicy {
            requests_per_minute: 600,
            requests_per_hour: Some(60),
            burst: 1,
        };
        let bucket = TokenBucket::new(&capped);
        // 60/hour -> 1/minute -> 1/60 tokens per second
        assert!((bucket.rate - 1.0 / 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_acquire_waits_then_succeeds() {
        let pacer = RequestPacer::new(&policy(6000, 2)); // 100/second
        pacer.acquire().await;
        pacer.acquire().await;

        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed().as_millis() >= 5);
    }
}
