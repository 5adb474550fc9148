//! A sink that discards everything. Used where metrics are optional per the
//! caller's config and a trait object is still required.

use fleet_types::ports::{Labels, MetricsSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn incr_counter(&self, _name: &'static str, _labels: &Labels, _value: u64) {}

    fn set_gauge(&self, _name: &'static str, _labels: &Labels, _value: f64) {}

    fn observe_histogram(&self, _name: &'static str, _labels: &Labels, _value: f64) {}
}
