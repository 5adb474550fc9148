//! The browser pool core. Grounded on the teacher's `BrowserPool`
//! (`riptide-headless::pool`): a `Mutex<VecDeque<_>>` of idle instances, a
//! `Mutex<HashMap<_>>` of checked-out ones, a background maintenance task, and
//! an event channel — generalized here to the driver/clock/metrics ports so
//! the whole thing runs against fakes in tests.

use crate::config::PoolConfig;
use crate::health::HealthMonitor;
use crate::metrics::PoolMetrics;
use crate::queue::{AcquisitionQueue, QueueOutcome};
use crate::recycling::{NoopResourceProbe, RecyclingEngine, ResourceProbe};
use chrono::Utc;
use fleet_events::{names, DomainEvent, EventBus, EventSeverity};
use fleet_reliability::CircuitBreaker;
use fleet_types::acquisition::{AcquireRequest, AcquisitionFailure};
use fleet_types::browser::{BrowserInstance, BrowserState};
use fleet_types::circuit::presets;
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::{BrowserDriver, BrowserHandle, Clock, LaunchSpec, MetricsSink, PageHandle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Entry {
    instance: BrowserInstance,
    handle: Arc<dyn BrowserHandle>,
    health_monitor: HealthMonitor,
}

#[derive(Default)]
struct Counters {
    launches: AtomicU64,
    closes: AtomicU64,
    health_failures: AtomicU64,
    recycles: AtomicU64,
    acquire_wait_ms_total: AtomicU64,
    acquire_count: AtomicU64,
}

pub struct BrowserPool {
    config: PoolConfig,
    driver: Arc<dyn BrowserDriver>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
    events: Option<Arc<EventBus>>,
    launch_circuit: Arc<CircuitBreaker>,
    recycling: RecyclingEngine,
    resource_probe: Arc<dyn ResourceProbe>,
    idle: Arc<Mutex<VecDeque<Entry>>>,
    in_use: Arc<Mutex<HashMap<String, Entry>>>,
    queue: Arc<Mutex<AcquisitionQueue>>,
    flagged_unhealthy: Arc<std::sync::Mutex<HashSet<String>>>,
    shutting_down: Arc<AtomicBool>,
    counters: Arc<Counters>,
    maintenance_task: Option<JoinHandle<()>>,
}

impl BrowserPool {
    pub async fn new(
        config: PoolConfig,
        driver: Arc<dyn BrowserDriver>,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        Self::with_extras(config, driver, clock, metrics, None, Arc::new(NoopResourceProbe)).await
    }

    pub async fn with_extras(
        config: PoolConfig,
        driver: Arc<dyn BrowserDriver>,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn MetricsSink>,
        events: Option<Arc<EventBus>>,
        resource_probe: Arc<dyn ResourceProbe>,
    ) -> Result<Self> {
        let now = clock.now();
        let launch_circuit = Arc::new(CircuitBreaker::new("browser.launch", presets::browser_launch(), now));
        let recycling = RecyclingEngine::new(config.recycling.clone());

        let mut pool = Self {
            config,
            driver,
            clock,
            metrics,
            events,
            launch_circuit,
            recycling,
            resource_probe,
            idle: Arc::new(Mutex::new(VecDeque::new())),
            in_use: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(AcquisitionQueue::new())),
            flagged_unhealthy: Arc::new(std::sync::Mutex::new(HashSet::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            maintenance_task: None,
        };

        let mut failed = 0usize;
        for _ in 0..pool.config.initial_pool_size {
            match pool.launch_one().await {
                Ok(entry) => pool.idle.lock().await.push_back(entry),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(error = %e, "failed to launch initial pool instance");
                }
            }
        }
        if failed > 0 {
            tracing::warn!(failed, "pool initialized with reduced capacity");
        }

        pool.maintenance_task = Some(pool.spawn_maintenance());
        Ok(pool)
    }

    fn spawn_maintenance(&self) -> JoinHandle<()> {
        let idle = self.idle.clone();
        let queue = self.queue.clone();
        let flagged_unhealthy = self.flagged_unhealthy.clone();
        let shutting_down = self.shutting_down.clone();
        let interval_dur = self.config.maintenance_interval;
        let max_idle = self.config.max_idle_time;
        let clock = self.clock.clone();
        let counters = self.counters.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                ticker.tick().await;
                if shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                let now = clock.now();

                // Evict idle-too-long instances.
                let mut expired = Vec::new();
                {
                    let mut guard = idle.lock().await;
                    let mut keep = VecDeque::new();
                    while let Some(entry) = guard.pop_front() {
                        if entry.instance.idle_for(now) > max_idle {
                            expired.push(entry);
                        } else {
                            keep.push_back(entry);
                        }
                    }
                    *guard = keep;
                }
                for entry in expired {
                    tracing::info!(browser_id = %entry.instance.id, "evicting idle-too-long instance");
                    flagged_unhealthy.lock().unwrap().remove(&entry.instance.id);
                    entry.health_monitor.stop();
                    let _ = entry.handle.close().await;
                    counters.closes.fetch_add(1, Ordering::SeqCst);
                }

                // Fulfill queued waiters against whatever is idle now.
                let idle_len = idle.lock().await.len();
                let mut q = queue.lock().await;
                let grantable = idle_len.min(q.len());
                for _ in 0..grantable {
                    q.pop_and_grant(now);
                }
            }
        })
    }

    async fn launch_one(&self) -> Result<Entry> {
        let mut last_err = None;
        for attempt in 0..=self.config.launch_retries {
            let now = self.clock.now();
            if self.launch_circuit.try_admit(now).await == fleet_reliability::Admission::Reject {
                return Err(FleetError::CircuitOpen("browser.launch".into()));
            }

            let spec = LaunchSpec {
                launch_timeout: self.config.launch_timeout,
                ..Default::default()
            };
            match self.driver.launch(&spec).await {
                Ok(boxed) => {
                    let handle: Arc<dyn BrowserHandle> = Arc::from(boxed);
                    if !handle.fast_health_check().await {
                        self.launch_circuit.on_failure(now).await;
                        last_err = Some(FleetError::BrowserCrash("failed post-launch verification".into()));
                        continue;
                    }
                    self.launch_circuit.on_success(now).await;
                    self.counters.launches.fetch_add(1, Ordering::SeqCst);
                    self.emit(names::POOL_BROWSER_LAUNCHED, handle.id(), EventSeverity::Info, now);

                    let id = handle.id().to_string();
                    let flagged = self.flagged_unhealthy.clone();
                    let counters = self.counters.clone();
                    let events = self.events.clone();
                    let monitor = HealthMonitor::spawn(
                        id.clone(),
                        handle.clone(),
                        self.config.health_check_interval,
                        self.config.health_check_timeout,
                        self.metrics.clone(),
                        move |browser_id| {
                            flagged.lock().unwrap().insert(browser_id.to_string());
                            counters.health_failures.fetch_add(1, Ordering::SeqCst);
                            if let Some(bus) = &events {
                                bus.emit(DomainEvent::new(
                                    "pool.browser.unhealthy",
                                    browser_id,
                                    EventSeverity::Warn,
                                    serde_json::json!({}),
                                    Utc::now(),
                                ));
                            }
                        },
                    );

                    return Ok(Entry {
                        instance: BrowserInstance::new(now),
                        handle,
                        health_monitor: monitor,
                    });
                }
                Err(e) => {
                    self.launch_circuit.on_failure(now).await;
                    last_err = Some(e);
                    if attempt < self.config.launch_retries {
                        tokio::time::sleep(self.config.launch_retry_backoff).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| FleetError::BrowserCrash("launch failed".into())))
    }

    fn emit(&self, event_type: &'static str, aggregate_id: &str, severity: EventSeverity, now: chrono::DateTime<Utc>) {
        if let Some(bus) = &self.events {
            bus.emit(DomainEvent::new(event_type, aggregate_id, severity, serde_json::json!({}), now));
        }
    }

    pub async fn acquire(&self, request: AcquireRequest) -> std::result::Result<BrowserInstance, AcquisitionFailure> {
        let started = self.clock.now();
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                return Err(AcquisitionFailure::Unavailable("pool is shutting down".into()));
            }

            let now = self.clock.now();
            if request.is_expired(now) {
                return Err(AcquisitionFailure::Timeout);
            }

            // LRU scan over idle instances, skipping any flagged unhealthy.
            let picked = {
                let mut idle = self.idle.lock().await;
                let flagged = self.flagged_unhealthy.lock().unwrap();
                let mut best_idx = None;
                let mut best_time = None;
                for (i, entry) in idle.iter().enumerate() {
                    if flagged.contains(&entry.instance.id) {
                        continue;
                    }
                    if best_time.is_none() || entry.instance.last_used_at < best_time.unwrap() {
                        best_time = Some(entry.instance.last_used_at);
                        best_idx = Some(i);
                    }
                }
                drop(flagged);
                best_idx.and_then(|i| idle.remove(i))
            };

            if let Some(mut entry) = picked {
                entry.instance.mark_active(request.session_id.as_str(), now);
                let instance = entry.instance.clone();
                self.in_use.lock().await.insert(instance.id.clone(), entry);
                self.record_wait(started, now);
                return Ok(instance);
            }

            let total = self.idle.lock().await.len() + self.in_use.lock().await.len();
            if total < self.config.max_pool_size {
                match self.launch_one().await {
                    Ok(mut entry) => {
                        entry.instance.mark_active(request.session_id.as_str(), now);
                        let instance = entry.instance.clone();
                        self.in_use.lock().await.insert(instance.id.clone(), entry);
                        self.record_wait(started, now);
                        return Ok(instance);
                    }
                    Err(_) => {
                        // Fall through to queueing; a future release may free capacity.
                    }
                }
            }

            let rx = self.queue.lock().await.push(request.clone());
            let remaining = (request.deadline - now).to_std().unwrap_or_default();
            match timeout(remaining, rx).await {
                Ok(Ok(QueueOutcome::Granted)) => continue,
                Ok(Ok(QueueOutcome::Unavailable)) | Ok(Err(_)) => {
                    return Err(AcquisitionFailure::Unavailable("pool is shutting down".into()))
                }
                Err(_) => return Err(AcquisitionFailure::Timeout),
            }
        }
    }

    fn record_wait(&self, started: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) {
        let wait_ms = (now - started).num_milliseconds().max(0) as u64;
        self.counters.acquire_wait_ms_total.fetch_add(wait_ms, Ordering::SeqCst);
        self.counters.acquire_count.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn release(&self, browser_id: &str, _session_id: &str) -> Result<()> {
        let entry = self.in_use.lock().await.remove(browser_id);
        let Some(mut entry) = entry else {
            tracing::warn!(browser_id, "release called for unknown or already-released browser");
            return Ok(());
        };

        let now = self.clock.now();
        entry.instance.mark_idle(now);

        let is_flagged = self.flagged_unhealthy.lock().unwrap().contains(browser_id);
        let over_use_cap = entry.instance.use_count >= self.config.max_use_count;
        let over_error_cap = entry.instance.error_count > self.config.max_error_count;

        let resource = self.resource_probe.sample(browser_id);
        let score = self.recycling.score(&entry.instance, resource, now);
        let should_dispose = is_flagged || over_use_cap || over_error_cap || score.should_recycle_on_release();

        if should_dispose {
            let _ = entry.instance.transition(BrowserState::Recycling);
            self.dispose(entry, score.should_recycle_on_release()).await;
            self.maybe_backfill().await;
        } else {
            self.idle.lock().await.push_back(entry);
            self.try_fulfill_waiters().await;
        }
        Ok(())
    }

    async fn dispose(&self, entry: Entry, was_recycle: bool) {
        self.flagged_unhealthy.lock().unwrap().remove(&entry.instance.id);
        entry.health_monitor.stop();
        if let Err(e) = entry.handle.close().await {
            tracing::warn!(browser_id = %entry.instance.id, error = %e, "error closing browser during dispose");
        }
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if was_recycle {
            self.counters.recycles.fetch_add(1, Ordering::SeqCst);
        }
        self.emit(names::POOL_BROWSER_DISPOSED, &entry.instance.id, EventSeverity::Info, self.clock.now());
    }

    async fn maybe_backfill(&self) {
        let total = self.idle.lock().await.len() + self.in_use.lock().await.len();
        if total < self.config.min_pool_size {
            match self.launch_one().await {
                Ok(entry) => self.idle.lock().await.push_back(entry),
                Err(e) => tracing::warn!(error = %e, "backfill launch failed"),
            }
        }
    }

    async fn try_fulfill_waiters(&self) {
        let now = self.clock.now();
        let idle_len = self.idle.lock().await.len();
        let mut q = self.queue.lock().await;
        let grantable = idle_len.min(q.len());
        for _ in 0..grantable {
            q.pop_and_grant(now);
        }
    }

    pub async fn new_page(&self, browser_id: &str) -> Result<Box<dyn PageHandle>> {
        let mut in_use = self.in_use.lock().await;
        let entry = in_use
            .get_mut(browser_id)
            .ok_or_else(|| FleetError::NotFound(format!("browser {browser_id} not checked out")))?;
        if entry.instance.page_count >= self.config.max_pages_per_browser {
            return Err(FleetError::QuotaExceeded(format!(
                "browser {browser_id} already has {} pages",
                entry.instance.page_count
            )));
        }
        let page = entry.handle.new_page().await?;
        entry.instance.record_page_created();
        Ok(page)
    }

    pub async fn shutdown(&self, grace_deadline: std::time::Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);
        if let Some(task) = &self.maintenance_task {
            task.abort();
        }

        self.queue.lock().await.drain_with_outcome(|| QueueOutcome::Unavailable);

        let idle_entries: Vec<Entry> = {
            let mut guard = self.idle.lock().await;
            guard.drain(..).collect()
        };
        for entry in idle_entries {
            entry.health_monitor.stop();
            let _ = entry.handle.close().await;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }

        let deadline = tokio::time::Instant::now() + grace_deadline;
        loop {
            if self.in_use.lock().await.is_empty() || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        let remaining: Vec<Entry> = {
            let mut guard = self.in_use.lock().await;
            guard.drain().map(|(_, e)| e).collect()
        };
        for entry in remaining {
            entry.health_monitor.stop();
            let _ = entry.handle.close().await;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub async fn metrics(&self) -> PoolMetrics {
        let idle = self.idle.lock().await.len();
        let active = self.in_use.lock().await.len();
        let queue_length = self.queue.lock().await.len();
        let total_capacity = self.config.max_pool_size.max(1);
        let acquire_count = self.counters.acquire_count.load(Ordering::SeqCst);
        let avg_wait_ms = if acquire_count > 0 {
            self.counters.acquire_wait_ms_total.load(Ordering::SeqCst) / acquire_count
        } else {
            0
        };

        PoolMetrics {
            idle,
            active,
            queue_length,
            utilization: active as f64 / total_capacity as f64,
            avg_acquire_wait: std::time::Duration::from_millis(avg_wait_ms),
            total_launches: self.counters.launches.load(Ordering::SeqCst),
            total_closes: self.counters.closes.load(Ordering::SeqCst),
            total_health_failures: self.counters.health_failures.load(Ordering::SeqCst),
            total_recycles: self.counters.recycles.load(Ordering::SeqCst),
        }
    }
}

impl Drop for BrowserPool {
    fn drop(&mut self) {
        if let Some(task) = &self.maintenance_task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testutil::{FakeClock, FakeDriver, FakeMetricsSink};

    fn test_config() -> PoolConfig {
        PoolConfig {
            min_pool_size: 0,
            max_pool_size: 2,
            initial_pool_size: 0,
            launch_retries: 0,
            maintenance_interval: std::time::Duration::from_secs(3600),
            ..Default::default()
        }
    }

    async fn test_pool() -> (BrowserPool, Arc<FakeDriver>, Arc<FakeClock>) {
        let driver = Arc::new(FakeDriver::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let metrics = Arc::new(FakeMetricsSink::new());
        let pool = BrowserPool::new(test_config(), driver.clone(), clock.clone(), metrics)
            .await
            .unwrap();
        (pool, driver, clock)
    }

    #[tokio::test]
    async fn acquire_launches_up_to_max_pool_size() {
        let (pool, _driver, clock) = test_pool().await;
        let req = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req.clone()).await.unwrap();
        assert_eq!(b1.state, BrowserState::Active);
        let m = pool.metrics().await;
        assert_eq!(m.active, 1);
        assert_eq!(m.total_launches, 1);
    }

    #[tokio::test]
    async fn release_returns_instance_to_idle() {
        let (pool, _driver, clock) = test_pool().await;
        let req = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req).await.unwrap();
        pool.release(&b1.id, "s1").await.unwrap();
        let m = pool.metrics().await;
        assert_eq!(m.idle, 1);
        assert_eq!(m.active, 0);
    }

    #[tokio::test]
    async fn acquire_times_out_when_pool_exhausted() {
        let (pool, _driver, clock) = test_pool().await;
        let req1 = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let req2 = AcquireRequest::new("s2", clock.now() + chrono::Duration::seconds(5));
        let _b1 = pool.acquire(req1).await.unwrap();
        let _b2 = pool.acquire(req2).await.unwrap();

        let req3 = AcquireRequest::new("s3", clock.now() + chrono::Duration::milliseconds(50));
        let result = pool.acquire(req3).await;
        assert!(matches!(result, Err(AcquisitionFailure::Timeout)));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (pool, _driver, clock) = test_pool().await;
        let req = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req).await.unwrap();
        pool.release(&b1.id, "s1").await.unwrap();
        pool.release(&b1.id, "s1").await.unwrap();
    }

    #[tokio::test]
    async fn new_page_refuses_over_quota() {
        let mut config = test_config();
        config.max_pages_per_browser = 1;
        let driver = Arc::new(FakeDriver::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let metrics = Arc::new(FakeMetricsSink::new());
        let pool = BrowserPool::new(config, driver, clock.clone(), metrics).await.unwrap();

        let req = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req).await.unwrap();
        let _p1 = pool.new_page(&b1.id).await.unwrap();
        let second = pool.new_page(&b1.id).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn instance_is_disposed_once_use_count_reaches_the_cap() {
        let mut config = test_config();
        config.max_use_count = 2;
        config.max_pages_per_browser = 10;
        let driver = Arc::new(FakeDriver::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let metrics = Arc::new(FakeMetricsSink::new());
        let pool = BrowserPool::new(config, driver, clock.clone(), metrics).await.unwrap();

        let req1 = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req1).await.unwrap();
        let _p1 = pool.new_page(&b1.id).await.unwrap();
        pool.release(&b1.id, "s1").await.unwrap();
        assert_eq!(pool.metrics().await.idle, 1);

        let req2 = AcquireRequest::new("s1", clock.now() + chrono::Duration::seconds(5));
        let b1 = pool.acquire(req2).await.unwrap();
        let _p2 = pool.new_page(&b1.id).await.unwrap();
        pool.release(&b1.id, "s1").await.unwrap();

        let m = pool.metrics().await;
        assert_eq!(m.idle, 0, "instance should have been disposed, not returned to idle");
    }
}
