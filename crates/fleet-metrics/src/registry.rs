//! `MetricsRegistry`: counters, gauges, and histograms behind one handle, shared
//! via `Arc` across the pool, executor, and reliability crates.
//!
//! Grounded on the teacher's `riptide-monitoring` adapter pattern
//! (`MonitoringSystemAdapter`/`TelemetrySystemAdapter` bridging a concrete
//! collector to an abstract port) — generalized here into a single registry that
//! *is* the port (`fleet_types::ports::MetricsSink`) plus a query surface for
//! introspection, since this workspace has no separate OTel exporter crate.

use dashmap::DashMap;
use fleet_types::ports::{Labels, MetricsSink};
use hdrhistogram::Histogram as HdrHistogram;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

fn label_key(name: &str, labels: &Labels) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let mut pairs: Vec<_> = labels.iter().collect();
    pairs.sort_by_key(|(k, _)| **k);
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}{{{joined}}}")
}

#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

struct TrackedHistogram {
    inner: Mutex<HdrHistogram<u64>>,
}

impl TrackedHistogram {
    fn new() -> Self {
        Self {
            // Tracks microsecond-resolution values up to ~1000s with 3 significant digits,
            // matching the teacher's hdrhistogram usage for latency percentiles.
            inner: Mutex::new(HdrHistogram::new_with_bounds(1, 1_000_000_000, 3).expect("valid hdr bounds")),
        }
    }

    fn record(&self, value: f64) {
        let scaled = (value * 1000.0).round().max(0.0) as u64;
        let mut hist = self.inner.lock().expect("histogram mutex poisoned");
        let _ = hist.record(scaled);
    }

    fn snapshot(&self) -> HistogramSnapshot {
        let hist = self.inner.lock().expect("histogram mutex poisoned");
        let to_millis = |v: u64| v as f64 / 1000.0;
        HistogramSnapshot {
            count: hist.len(),
            min: to_millis(hist.min()),
            max: to_millis(hist.max()),
            mean: hist.mean() / 1000.0,
            p50: to_millis(hist.value_at_quantile(0.5)),
            p95: to_millis(hist.value_at_quantile(0.95)),
            p99: to_millis(hist.value_at_quantile(0.99)),
        }
    }
}

/// Counters use a signed backing store so `set_gauge` (not monotonic) and
/// `incr_counter` (monotonic) can share the key space without a type tag.
pub struct MetricsRegistry {
    counters: DashMap<String, AtomicU64>,
    gauges: DashMap<String, AtomicI64>,
    histograms: DashMap<String, TrackedHistogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            gauges: DashMap::new(),
            histograms: DashMap::new(),
        }
    }

    pub fn counter_value(&self, name: &str, labels: &Labels) -> u64 {
        let key = label_key(name, labels);
        self.counters
            .get(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn gauge_value(&self, name: &str, labels: &Labels) -> i64 {
        let key = label_key(name, labels);
        self.gauges
            .get(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn histogram_snapshot(&self, name: &str, labels: &Labels) -> Option<HistogramSnapshot> {
        let key = label_key(name, labels);
        self.histograms.get(&key).map(|h| h.snapshot())
    }

    pub fn counter_names(&self) -> Vec<String> {
        self.counters.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MetricsRegistry {
    fn incr_counter(&self, name: &'static str, labels: &Labels, value: u64) {
        let key = label_key(name, labels);
        self.counters
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    fn set_gauge(&self, name: &'static str, labels: &Labels, value: f64) {
        let key = label_key(name, labels);
        self.gauges
            .entry(key)
            .or_insert_with(|| AtomicI64::new(0))
            .store(value as i64, Ordering::Relaxed);
    }

    fn observe_histogram(&self, name: &'static str, labels: &Labels, value: f64) {
        let key = label_key(name, labels);
        self.histograms
            .entry(key)
            .or_insert_with(TrackedHistogram::new)
            .record(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn counters_accumulate_per_label_set() {
        let reg = MetricsRegistry::new();
        let mut labels: Labels = HashMap::new();
        labels.insert("pool", "default".to_string());
        reg.incr_counter("pool.launches", &labels, 1);
        reg.incr_counter("pool.launches", &labels, 2);
        assert_eq!(reg.counter_value("pool.launches", &labels), 3);
        assert_eq!(reg.counter_value("pool.launches", &Labels::new()), 0);
    }

    #[test]
    fn gauge_overwrites() {
        let reg = MetricsRegistry::new();
        let labels = Labels::new();
        reg.set_gauge("pool.in_use", &labels, 4.0);
        reg.set_gauge("pool.in_use", &labels, 7.0);
        assert_eq!(reg.gauge_value("pool.in_use", &labels), 7);
    }

    #[test]
    fn histogram_reports_percentiles() {
        let reg = MetricsRegistry::new();
        let labels = Labels::new();
        for ms in [10.0, 20.0, 30.0, 40.0, 50.0] {
            reg.observe_histogram("acquire.wait_ms", &labels, ms);
        }
        let snap = reg.histogram_snapshot("acquire.wait_ms", &labels).unwrap();
        assert_eq!(snap.count, 5);
        assert!(snap.p50 >= 20.0 && snap.p50 <= 40.0);
        assert!(reg.histogram_snapshot("nonexistent", &labels).is_none());
    }
}
