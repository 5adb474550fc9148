use std::time::Duration;

/// Grounded on the teacher's `BrowserPoolConfig` (`riptide-headless::pool`), renamed
/// and trimmed to the fields spec.md §4.1/§4.3 actually names — no WASM-pool or
/// v8-heap-stats fields here, those belong to a different kind of pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub min_pool_size: usize,
    pub max_pool_size: usize,
    pub initial_pool_size: usize,
    pub max_pages_per_browser: u32,
    pub max_idle_time: chrono::Duration,
    pub maintenance_interval: Duration,
    pub health_check_interval: Duration,
    pub health_check_timeout: Duration,
    pub launch_timeout: Duration,
    pub launch_retries: u32,
    pub launch_retry_backoff: Duration,
    pub max_use_count: u64,
    pub max_error_count: u32,
    pub recycling: RecyclingConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: 1,
            max_pool_size: 10,
            initial_pool_size: 2,
            max_pages_per_browser: 10,
            max_idle_time: chrono::Duration::seconds(120),
            maintenance_interval: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(15),
            health_check_timeout: Duration::from_secs(5),
            launch_timeout: Duration::from_secs(30),
            launch_retries: 3,
            launch_retry_backoff: Duration::from_secs(2),
            max_use_count: 500,
            max_error_count: 20,
            recycling: RecyclingConfig::default(),
        }
    }
}

/// Weights and thresholds for the four-axis recycling score in spec.md §4.3.
#[derive(Clone, Debug)]
pub struct RecyclingConfig {
    pub max_lifetime: chrono::Duration,
    pub max_idle_time: chrono::Duration,
    pub max_use_count: u64,
    pub max_page_count: u32,
    pub health_threshold: u8,
    pub memory_limit_mb: u64,
    pub cpu_limit_percent: f64,
    pub hybrid_cutoff: f64,
}

impl Default for RecyclingConfig {
    fn default() -> Self {
        Self {
            max_lifetime: chrono::Duration::minutes(30),
            max_idle_time: chrono::Duration::seconds(120),
            max_use_count: 500,
            max_page_count: 10,
            health_threshold: 50,
            memory_limit_mb: 500,
            cpu_limit_percent: 80.0,
            hybrid_cutoff: 90.0,
        }
    }
}
