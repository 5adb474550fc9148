//! Advisory performance optimizer, per spec.md §4.5: consults recent history
//! for the same action type and context to produce pre-dispatch hints, then
//! scores how close the estimate came to the real duration.

use crate::history::ActionHistory;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OptimizationHints {
    pub block_resource_types: Vec<String>,
    pub disable_javascript: bool,
    pub cache_enabled: bool,
    pub estimated_duration: Duration,
}

impl Default for OptimizationHints {
    fn default() -> Self {
        Self {
            block_resource_types: Vec::new(),
            disable_javascript: false,
            cache_enabled: true,
            estimated_duration: Duration::from_secs(1),
        }
    }
}

const HEAVY_ACTION_THRESHOLD: Duration = Duration::from_secs(3);
const SAMPLE_WINDOW: usize = 20;

/// Stateless over anything but the shared history; cheap to construct per request.
pub struct PerformanceOptimizer<'a> {
    history: &'a ActionHistory,
}

impl<'a> PerformanceOptimizer<'a> {
    pub fn new(history: &'a ActionHistory) -> Self {
        Self { history }
    }

    /// Recent same-type actions in this context have been slow: ask the
    /// handler to block non-essential resources and disable script execution
    /// before dispatch. Navigate is the only action type heavy enough to
    /// benefit from resource blocking; everything else keeps defaults.
    pub fn hints(&self, session_id: &str, context_id: &str, action_type: &str) -> OptimizationHints {
        let recent = self.history.recent(session_id, context_id, action_type, SAMPLE_WINDOW);
        if recent.is_empty() {
            return OptimizationHints::default();
        }

        let avg = average_duration(&recent);
        let mut hints = OptimizationHints { estimated_duration: avg, ..OptimizationHints::default() };

        if action_type == "navigate" && avg > HEAVY_ACTION_THRESHOLD {
            hints.block_resource_types = vec!["image".into(), "media".into(), "font".into()];
            hints.cache_enabled = true;
        }

        hints
    }

    /// `1 − clamp((actual − estimated) / estimated, 0, 1)`: 1.0 when the
    /// action finished at or under estimate, trending to 0 the further over
    /// budget it ran.
    pub fn score(estimated: Duration, actual: Duration) -> f64 {
        let est = estimated.as_secs_f64();
        if est <= 0.0 {
            return 1.0;
        }
        let overrun = (actual.as_secs_f64() - est) / est;
        1.0 - overrun.clamp(0.0, 1.0)
    }
}

fn average_duration(entries: &[crate::history::HistoryEntry]) -> Duration {
    let total: Duration = entries.iter().map(|e| e.duration).sum();
    total / entries.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use chrono::Utc;

    fn history_with(durations_ms: &[u64], success: bool) -> ActionHistory {
        let history = ActionHistory::new(100);
        for &ms in durations_ms {
            history.record(
                "s1",
                "c1",
                HistoryEntry {
                    action_type: "navigate",
                    success,
                    duration: Duration::from_millis(ms),
                    error_class: None,
                    timestamp: Utc::now(),
                },
            );
        }
        history
    }

    #[test]
    fn no_history_returns_defaults() {
        let history = ActionHistory::new(10);
        let hints = PerformanceOptimizer::new(&history).hints("s1", "c1", "navigate");
        assert!(hints.block_resource_types.is_empty());
    }

    #[test]
    fn slow_navigations_trigger_resource_blocking() {
        let history = history_with(&[4000, 4200, 3900], true);
        let hints = PerformanceOptimizer::new(&history).hints("s1", "c1", "navigate");
        assert!(!hints.block_resource_types.is_empty());
    }

    #[test]
    fn score_is_one_when_under_estimate() {
        let score = PerformanceOptimizer::score(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn score_drops_toward_zero_when_over_estimate() {
        let score = PerformanceOptimizer::score(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(score, 0.0);
    }
}
