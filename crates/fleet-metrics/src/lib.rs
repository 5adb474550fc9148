//! Counters, histograms, and gauges for the fleet. The registry implements
//! `fleet_types::ports::MetricsSink` directly so it can be handed to the pool,
//! executor, and reliability crates as `Arc<dyn MetricsSink>`.

pub mod noop;
pub mod registry;

pub use noop::NoopMetricsSink;
pub use registry::{HistogramSnapshot, MetricsRegistry};
