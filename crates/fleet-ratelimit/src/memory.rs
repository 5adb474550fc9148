//! In-memory fixed-window rate limiter. Grounded on the teacher's
//! `RedisRateLimiter` window-counter shape (`riptide-cache::adapters::redis_rate_limiter`),
//! minus Redis: a `DashMap<key, WindowState>` stands in for the `INCR`+`EXPIRE`
//! pair, with the window boundary driven by an injected `Clock` for testability.

use async_trait::async_trait;
use dashmap::DashMap;
use fleet_types::error::FleetError;
use fleet_types::ports::{Clock, RateLimitDecision, RateLimitStats, RateLimiter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct WindowState {
    count: u32,
    window_started_at: chrono::DateTime<chrono::Utc>,
}

pub struct InMemoryRateLimiter {
    clock: Arc<dyn Clock>,
    windows: DashMap<String, WindowState>,
    total_rejections: AtomicU64,
    total_admissions: AtomicU64,
}

impl InMemoryRateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: DashMap::new(),
            total_rejections: AtomicU64::new(0),
            total_admissions: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_consume(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision, FleetError> {
        let now = self.clock.now();
        let window_chrono = chrono::Duration::from_std(window)
            .map_err(|e| FleetError::Configuration(format!("invalid rate-limit window: {e}")))?;

        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| WindowState { count: 0, window_started_at: now });

        if now - entry.window_started_at >= window_chrono {
            entry.count = 0;
            entry.window_started_at = now;
        }

        let reset_in = (entry.window_started_at + window_chrono - now).to_std().unwrap_or(Duration::ZERO);

        if entry.count >= limit {
            self.total_rejections.fetch_add(1, Ordering::Relaxed);
            return Ok(RateLimitDecision { allowed: false, remaining: 0, reset_in, limit });
        }

        entry.count += 1;
        self.total_admissions.fetch_add(1, Ordering::Relaxed);
        Ok(RateLimitDecision { allowed: true, remaining: limit - entry.count, reset_in, limit })
    }

    async fn reset(&self, key: &str) -> Result<(), FleetError> {
        self.windows.remove(key);
        Ok(())
    }

    async fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            total_keys_tracked: self.windows.len(),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
            total_admissions: self.total_admissions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testutil::FakeClock;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let limiter = InMemoryRateLimiter::new(clock);

        for _ in 0..3 {
            let decision = limiter.check_and_consume("k", 3, Duration::from_secs(60)).await.unwrap();
            assert!(decision.allowed);
        }
        let rejected = limiter.check_and_consume("k", 3, Duration::from_secs(60)).await.unwrap();
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let limiter = InMemoryRateLimiter::new(clock.clone());

        limiter.check_and_consume("k", 1, Duration::from_secs(1)).await.unwrap();
        let rejected = limiter.check_and_consume("k", 1, Duration::from_secs(1)).await.unwrap();
        assert!(!rejected.allowed);

        clock.advance(chrono::Duration::seconds(2));
        let admitted = limiter.check_and_consume("k", 1, Duration::from_secs(1)).await.unwrap();
        assert!(admitted.allowed);
    }

    #[tokio::test]
    async fn reset_clears_the_window() {
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let limiter = InMemoryRateLimiter::new(clock);
        limiter.check_and_consume("k", 1, Duration::from_secs(60)).await.unwrap();
        limiter.reset("k").await.unwrap();
        let decision = limiter.check_and_consume("k", 1, Duration::from_secs(60)).await.unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn stats_track_admissions_and_rejections() {
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let limiter = InMemoryRateLimiter::new(clock);
        limiter.check_and_consume("k", 1, Duration::from_secs(60)).await.unwrap();
        limiter.check_and_consume("k", 1, Duration::from_secs(60)).await.unwrap();
        let stats = limiter.stats().await;
        assert_eq!(stats.total_admissions, 1);
        assert_eq!(stats.total_rejections, 1);
        assert_eq!(stats.total_keys_tracked, 1);
    }
}
