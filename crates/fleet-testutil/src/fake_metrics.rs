use fleet_types::ports::{Labels, MetricsSink};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCounter {
    pub name: &'static str,
    pub labels: Labels,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGauge {
    pub name: &'static str,
    pub labels: Labels,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedHistogram {
    pub name: &'static str,
    pub labels: Labels,
    pub value: f64,
}

/// A `MetricsSink` that records every call instead of discarding it, so tests
/// can assert on what the code under test emitted. Where `NoopMetricsSink`
/// exists to disable metrics cheaply, this one exists to observe them.
#[derive(Default)]
pub struct FakeMetricsSink {
    counters: Mutex<Vec<RecordedCounter>>,
    gauges: Mutex<Vec<RecordedGauge>>,
    histograms: Mutex<Vec<RecordedHistogram>>,
}

impl FakeMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Vec<RecordedCounter> {
        self.counters.lock().clone()
    }

    pub fn gauges(&self) -> Vec<RecordedGauge> {
        self.gauges.lock().clone()
    }

    pub fn histograms(&self) -> Vec<RecordedHistogram> {
        self.histograms.lock().clone()
    }

    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.value)
            .sum()
    }
}

impl MetricsSink for FakeMetricsSink {
    fn incr_counter(&self, name: &'static str, labels: &Labels, value: u64) {
        self.counters.lock().push(RecordedCounter {
            name,
            labels: labels.clone(),
            value,
        });
    }

    fn set_gauge(&self, name: &'static str, labels: &Labels, value: f64) {
        self.gauges.lock().push(RecordedGauge {
            name,
            labels: labels.clone(),
            value,
        });
    }

    fn observe_histogram(&self, name: &'static str, labels: &Labels, value: f64) {
        self.histograms.lock().push(RecordedHistogram {
            name,
            labels: labels.clone(),
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn counter_total_sums_across_calls() {
        let sink = FakeMetricsSink::new();
        let labels = HashMap::new();
        sink.incr_counter("pool.acquire", &labels, 1);
        sink.incr_counter("pool.acquire", &labels, 2);
        assert_eq!(sink.counter_total("pool.acquire"), 3);
    }

    #[test]
    fn gauge_records_every_observation() {
        let sink = FakeMetricsSink::new();
        let labels = HashMap::new();
        sink.set_gauge("pool.size", &labels, 4.0);
        sink.set_gauge("pool.size", &labels, 5.0);
        assert_eq!(sink.gauges().len(), 2);
    }
}
