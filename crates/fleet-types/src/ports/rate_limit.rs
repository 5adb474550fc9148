//! Grounded on the teacher's `riptide-types::ports::rate_limit::RateLimiter` trait.

use crate::error::FleetError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: Duration,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitStats {
    pub total_keys_tracked: usize,
    pub total_rejections: u64,
    pub total_admissions: u64,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Checks and, if admitted, consumes one unit of quota for `key` atomically.
    async fn check_and_consume(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision, FleetError>;

    async fn reset(&self, key: &str) -> Result<(), FleetError>;

    async fn stats(&self) -> RateLimitStats;
}
