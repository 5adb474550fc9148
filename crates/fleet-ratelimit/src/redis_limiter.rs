//! Redis-backed rate limiter. Grounded directly on the teacher's
//! `RedisRateLimiter` (`riptide-cache::adapters::redis_rate_limiter`): atomic
//! `INCR` plus a conditional `EXPIRE` on the first increment of a window,
//! under the key namespace `ratelimit:v1:{key}`.

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use fleet_types::error::FleetError;
use fleet_types::ports::{RateLimitDecision, RateLimitStats, RateLimiter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct RedisRateLimiter {
    pool: Arc<Pool>,
    total_rejections: AtomicU64,
    total_admissions: AtomicU64,
}

impl RedisRateLimiter {
    pub fn new(redis_url: &str) -> Result<Self, FleetError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| FleetError::ExternalService(format!("failed to create redis pool: {e}")))?;
        Ok(Self::from_pool(Arc::new(pool)))
    }

    pub fn from_pool(pool: Arc<Pool>) -> Self {
        Self { pool, total_rejections: AtomicU64::new(0), total_admissions: AtomicU64::new(0) }
    }

    fn quota_key(key: &str) -> String {
        format!("ratelimit:v1:{key}")
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_and_consume(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision, FleetError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis connection failed: {e}")))?;
        let redis_key = Self::quota_key(key);

        let count: u32 = conn
            .incr(&redis_key, 1)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis INCR failed: {e}")))?;
        if count == 1 {
            let _: () = conn
                .expire(&redis_key, window.as_secs().max(1) as i64)
                .await
                .map_err(|e| FleetError::ExternalService(format!("redis EXPIRE failed: {e}")))?;
        }

        let ttl: i64 = conn
            .ttl(&redis_key)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis TTL failed: {e}")))?;
        let reset_in = Duration::from_secs(ttl.max(0) as u64);

        if count > limit {
            self.total_rejections.fetch_add(1, Ordering::Relaxed);
            return Ok(RateLimitDecision { allowed: false, remaining: 0, reset_in, limit });
        }

        self.total_admissions.fetch_add(1, Ordering::Relaxed);
        Ok(RateLimitDecision { allowed: true, remaining: limit - count, reset_in, limit })
    }

    async fn reset(&self, key: &str) -> Result<(), FleetError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis connection failed: {e}")))?;
        let _: () = conn
            .del(Self::quota_key(key))
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis DEL failed: {e}")))?;
        Ok(())
    }

    async fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            // Counting tracked keys would require a KEYS scan; not worth the
            // cost here, matching the teacher's own stats-via-scan limitation.
            total_keys_tracked: 0,
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
            total_admissions: self.total_admissions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_key_matches_the_teacher_format() {
        assert_eq!(RedisRateLimiter::quota_key("auth:alice"), "ratelimit:v1:auth:alice");
    }
}
