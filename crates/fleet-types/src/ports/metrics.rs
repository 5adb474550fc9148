//! A sink for the metrics registry in spec.md §7. Grounded on the teacher's
//! `riptide-monitoring` metrics-adapter pattern: a narrow trait the core emits
//! into, with Prometheus/no-op/in-memory implementations living in `fleet-metrics`.

use std::collections::HashMap;

pub type Labels = HashMap<&'static str, String>;

pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &'static str, labels: &Labels, value: u64);

    fn set_gauge(&self, name: &'static str, labels: &Labels, value: f64);

    fn observe_histogram(&self, name: &'static str, labels: &Labels, value: f64);
}
