//! Per-instance health monitoring. Grounded on the teacher's tiered
//! fast/full health check split (`riptide-headless::pool::PooledBrowser::{fast_health_check,
//! full_health_check}`), driven here by a background task per spec.md §4.2 rather
//! than the pool's own maintenance tick, so a slow instance can't starve the
//! checks on its siblings.

use fleet_types::ports::{BrowserHandle, MetricsSink};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 3;

/// Owns the background task; dropping or calling `stop` aborts it, mirroring
/// the teacher's `handler_task.abort()` on `PooledBrowser` drop.
pub struct HealthMonitor {
    task: JoinHandle<()>,
    consecutive_failures: Arc<AtomicU32>,
}

impl HealthMonitor {
    /// Starts monitoring `handle`. `on_unhealthy` fires once per crossing of the
    /// consecutive-failure threshold (it does not re-fire on every subsequent
    /// failed check), and a success afterward resets the counter.
    pub fn spawn(
        browser_id: String,
        handle: Arc<dyn BrowserHandle>,
        check_interval: Duration,
        check_timeout: Duration,
        metrics: Arc<dyn MetricsSink>,
        on_unhealthy: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let consecutive_failures = Arc::new(AtomicU32::new(0));
        let failures_handle = consecutive_failures.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            let labels = std::collections::HashMap::new();
            loop {
                ticker.tick().await;
                let started = Instant::now();
                let healthy = match timeout(check_timeout, handle.fast_health_check()).await {
                    Ok(ok) => ok,
                    Err(_) => false,
                };
                metrics.observe_histogram(
                    "pool.health_check.duration_ms",
                    &labels,
                    started.elapsed().as_secs_f64() * 1000.0,
                );

                if healthy {
                    failures_handle.store(0, Ordering::SeqCst);
                } else {
                    let count = failures_handle.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::warn!(browser_id = %browser_id, consecutive_failures = count, "health check failed");
                    if count == CONSECUTIVE_FAILURE_THRESHOLD {
                        on_unhealthy(&browser_id);
                    }
                }
            }
        });

        Self {
            task,
            consecutive_failures,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_metrics::noop::NoopMetricsSink;
    use fleet_testutil::FakeDriver;
    use fleet_types::ports::{BrowserDriver, LaunchSpec};
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn three_consecutive_failures_trigger_callback() {
        let driver = FakeDriver::new();
        let handle: Arc<dyn BrowserHandle> = Arc::from(driver.launch(&LaunchSpec::default()).await.unwrap());
        driver.set_healthy(false);

        let fired = Arc::new(AtomicBool::new(false));
        let fired_cb = fired.clone();
        let monitor = HealthMonitor::spawn(
            "b1".into(),
            handle,
            Duration::from_millis(5),
            Duration::from_millis(50),
            Arc::new(NoopMetricsSink),
            move |_id| fired_cb.store(true, Ordering::SeqCst),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(monitor.consecutive_failures() >= CONSECUTIVE_FAILURE_THRESHOLD);
        assert!(fired.load(Ordering::SeqCst));
        monitor.stop();
    }
}
