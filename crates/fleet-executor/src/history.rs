//! Bounded per-(session, context) action history and aggregation, per
//! spec.md §4.5: FIFO eviction at 1000 entries, counts/success-rate/
//! percentile-duration/error-class rollups.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleet_types::action::ErrorClass;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action_type: &'static str,
    pub success: bool,
    pub duration: Duration,
    pub error_class: Option<ErrorClass>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActionStats {
    pub count: usize,
    pub success_count: usize,
    pub success_rate: f64,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub by_action_type: HashMap<&'static str, usize>,
    pub by_error_class: HashMap<ErrorClass, usize>,
}

/// Keyed by `(session_id, context_id)`, each entry a FIFO-bounded ring of the
/// most recent actions. Grounded on the teacher's bounded-history ring buffers
/// elsewhere in the pool (`VecDeque` with a capacity cap and front-pop eviction).
pub struct ActionHistory {
    capacity: usize,
    entries: DashMap<(String, String), VecDeque<HistoryEntry>>,
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: DashMap::new() }
    }

    pub fn record(&self, session_id: &str, context_id: &str, entry: HistoryEntry) {
        let key = (session_id.to_string(), context_id.to_string());
        let mut ring = self.entries.entry(key).or_default();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(entry);
    }

    pub fn recent(&self, session_id: &str, context_id: &str, action_type: &str, limit: usize) -> Vec<HistoryEntry> {
        let key = (session_id.to_string(), context_id.to_string());
        match self.entries.get(&key) {
            Some(ring) => ring
                .iter()
                .rev()
                .filter(|e| e.action_type == action_type)
                .take(limit)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn aggregate(&self, session_id: &str, context_id: &str) -> ActionStats {
        let key = (session_id.to_string(), context_id.to_string());
        let ring = match self.entries.get(&key) {
            Some(r) => r,
            None => return ActionStats::default(),
        };

        let mut durations: Vec<Duration> = ring.iter().map(|e| e.duration).collect();
        durations.sort();

        let mut by_action_type: HashMap<&'static str, usize> = HashMap::new();
        let mut by_error_class: HashMap<ErrorClass, usize> = HashMap::new();
        let mut success_count = 0usize;
        for entry in ring.iter() {
            *by_action_type.entry(entry.action_type).or_insert(0) += 1;
            if entry.success {
                success_count += 1;
            } else if let Some(class) = entry.error_class {
                *by_error_class.entry(class).or_insert(0) += 1;
            }
        }

        let count = ring.len();
        ActionStats {
            count,
            success_count,
            success_rate: if count == 0 { 0.0 } else { success_count as f64 / count as f64 },
            p50: percentile(&durations, 0.50),
            p90: percentile(&durations, 0.90),
            p99: percentile(&durations, 0.99),
            by_action_type,
            by_error_class,
        }
    }

    pub fn clear_session(&self, session_id: &str) {
        self.entries.retain(|(sid, _), _| sid != session_id);
    }

    pub fn clear_context(&self, session_id: &str, context_id: &str) {
        self.entries.remove(&(session_id.to_string(), context_id.to_string()));
    }
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(action_type: &'static str, success: bool, ms: u64) -> HistoryEntry {
        HistoryEntry {
            action_type,
            success,
            duration: Duration::from_millis(ms),
            error_class: if success { None } else { Some(ErrorClass::Timeout) },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn fifo_eviction_caps_ring_size() {
        let history = ActionHistory::new(3);
        for i in 0..5 {
            history.record("s1", "c1", entry("click", true, i));
        }
        let stats = history.aggregate("s1", "c1");
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn success_rate_reflects_failures() {
        let history = ActionHistory::new(10);
        history.record("s1", "c1", entry("click", true, 10));
        history.record("s1", "c1", entry("click", false, 20));
        let stats = history.aggregate("s1", "c1");
        assert_eq!(stats.success_rate, 0.5);
        assert_eq!(stats.by_error_class.get(&ErrorClass::Timeout), Some(&1));
    }

    #[test]
    fn clear_context_removes_only_that_context() {
        let history = ActionHistory::new(10);
        history.record("s1", "c1", entry("click", true, 1));
        history.record("s1", "c2", entry("click", true, 1));
        history.clear_context("s1", "c1");
        assert_eq!(history.aggregate("s1", "c1").count, 0);
        assert_eq!(history.aggregate("s1", "c2").count, 1);
    }
}
