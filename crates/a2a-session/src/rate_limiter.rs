//! Per-endpoint token-bucket rate limiter, applied to public endpoints to
//! bound request rate with a configurable steady rate and burst size.

use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Classic token bucket: `steady_rate` tokens/sec refill, capped at
/// `burst`. One bucket per endpoint key (the public-surface defense spec
/// §9 prefers over per-sender buckets).
pub struct RateLimiter {
    steady_rate: f64,
    burst: f64,
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(steady_rate_per_sec: u32, burst: u32) -> Self {
        Self {
            steady_rate: steady_rate_per_sec as f64,
            burst: burst as f64,
            buckets: DashMap::new(),
        }
    }

    /// Attempts to consume one token for `endpoint`. Returns `true` if
    /// permitted, `false` if the caller should back off.
    pub async fn try_acquire(&self, endpoint: &str) -> bool {
        let entry = self
            .buckets
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                Mutex::new(Bucket {
                    tokens: self.burst,
                    last_refill: Instant::now(),
                })
            });
        let mut bucket = entry.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.steady_rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Milliseconds until at least one token would be available, used to
    /// populate `A2aError::RateLimited { retry_after_ms }`.
    pub async fn retry_after_ms(&self, endpoint: &str) -> u64 {
        match self.buckets.get(endpoint) {
            Some(entry) => {
                let bucket = entry.lock().await;
                let deficit = (1.0 - bucket.tokens).max(0.0);
                ((deficit / self.steady_rate) * 1000.0).ceil() as u64
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_then_steady_state_throttles() {
        let limiter = RateLimiter::new(5, 10);
        for _ in 0..10 {
            assert!(limiter.try_acquire("ep1").await);
        }
        assert!(!limiter.try_acquire("ep1").await);
    }

    #[tokio::test]
    async fn separate_endpoints_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.try_acquire("a").await);
        assert!(limiter.try_acquire("b").await);
    }
}
