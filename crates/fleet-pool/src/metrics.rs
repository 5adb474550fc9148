use std::time::Duration;

/// Point-in-time pool statistics, per spec.md §4.1's `metrics()` contract.
#[derive(Debug, Clone, Default)]
pub struct PoolMetrics {
    pub idle: usize,
    pub active: usize,
    pub queue_length: usize,
    pub utilization: f64,
    pub avg_acquire_wait: Duration,
    pub total_launches: u64,
    pub total_closes: u64,
    pub total_health_failures: u64,
    pub total_recycles: u64,
}
