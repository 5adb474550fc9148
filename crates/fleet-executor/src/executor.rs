//! The action executor: single entry point `execute(action, session_id,
//! context_id) -> ActionResult`, per spec.md §4.5.

use crate::config::ExecutorConfig;
use crate::handlers;
use crate::history::{ActionHistory, HistoryEntry};
use crate::optimizer::PerformanceOptimizer;
use crate::validation::validate;
use fleet_events::{names, DomainEvent, EventBus, EventSeverity};
use fleet_types::action::{Action, ActionResult, ErrorClass};
use fleet_types::error::{ErrorCategory, FleetError};
use fleet_types::ports::{Clock, MetricsSink, PageHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct ActionExecutor {
    config: ExecutorConfig,
    history: ActionHistory,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
}

impl ActionExecutor {
    pub fn new(config: ExecutorConfig, events: Arc<EventBus>, clock: Arc<dyn Clock>, metrics: Arc<dyn MetricsSink>) -> Self {
        let history = ActionHistory::new(config.history_capacity);
        Self { config, history, events, clock, metrics }
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub async fn execute(&self, page: &dyn PageHandle, action: Action, session_id: &str, context_id: &str) -> ActionResult {
        let action_type = action.kind();
        let now = self.clock.now();

        let validation = validate(&action, &self.config);
        if !validation.is_valid() {
            let message = validation
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            self.events.emit(DomainEvent::new(
                names::ACTION_VALIDATION_FAILED,
                context_id,
                EventSeverity::Warn,
                serde_json::json!({ "action_type": action_type, "session_id": session_id }),
                now,
            ));
            return ActionResult::err(action_type, message, ErrorClass::Validation, Duration::ZERO, now);
        }

        let optimizer = PerformanceOptimizer::new(&self.history);
        let hints = optimizer.hints(session_id, context_id, action_type);
        self.apply_hints(page, &hints).await;

        let started = Instant::now();
        let outcome = handlers::dispatch(page, &action).await;
        let elapsed = started.elapsed();

        self.revert_hints(page, &hints).await;

        let result = match outcome {
            Ok(data) => ActionResult::ok(action_type, data, elapsed, self.clock.now()),
            Err(e) => {
                let class = classify(&e);
                tracing::warn!(action_type, session_id, context_id, error = %e, ?class, "action dispatch failed");
                ActionResult::err(action_type, e.to_string(), class, elapsed, self.clock.now())
            }
        };

        self.record(session_id, context_id, &result, &hints, elapsed);
        result
    }

    async fn apply_hints(&self, page: &dyn PageHandle, hints: &crate::optimizer::OptimizationHints) {
        if !hints.block_resource_types.is_empty() {
            let _ = page.set_blocked_resource_types(Some(&hints.block_resource_types)).await;
        }
        if hints.disable_javascript {
            let _ = page.set_javascript_enabled(false).await;
        }
        let _ = page.set_cache_enabled(hints.cache_enabled).await;
    }

    async fn revert_hints(&self, page: &dyn PageHandle, hints: &crate::optimizer::OptimizationHints) {
        if !hints.block_resource_types.is_empty() {
            let _ = page.set_blocked_resource_types(None).await;
        }
        if hints.disable_javascript {
            let _ = page.set_javascript_enabled(true).await;
        }
    }

    fn record(&self, session_id: &str, context_id: &str, result: &ActionResult, hints: &crate::optimizer::OptimizationHints, elapsed: Duration) {
        self.history.record(
            session_id,
            context_id,
            HistoryEntry {
                action_type: result.action_type,
                success: result.success,
                duration: result.duration,
                error_class: result.error_class,
                timestamp: result.timestamp,
            },
        );

        let perf_score = PerformanceOptimizer::score(hints.estimated_duration, elapsed);
        let mut labels = HashMap::new();
        labels.insert("action_type", result.action_type.to_string());
        self.metrics.observe_histogram("executor.action_duration_ms", &labels, elapsed.as_millis() as f64);
        self.metrics.incr_counter("executor.actions_total", &labels, 1);
        self.metrics.set_gauge("executor.last_performance_score", &labels, perf_score);

        self.events.emit(
            DomainEvent::new(
                names::ACTION_EXECUTED,
                context_id,
                if result.success { EventSeverity::Info } else { EventSeverity::Warn },
                serde_json::json!({
                    "action_type": result.action_type,
                    "session_id": session_id,
                    "success": result.success,
                    "duration_ms": elapsed.as_millis(),
                    "performance_score": perf_score,
                }),
                result.timestamp,
            )
            .with_metadata("session_id", session_id),
        );
    }
}

fn classify(err: &FleetError) -> ErrorClass {
    match err {
        FleetError::BrowserTimeout(_) => ErrorClass::Timeout,
        FleetError::Network(_) | FleetError::ExternalService(_) => ErrorClass::Network,
        FleetError::Authentication(_) | FleetError::Authorization(_) | FleetError::Security(_) => ErrorClass::Permission,
        FleetError::Validation(_) => ErrorClass::Validation,
        FleetError::NotFound(_) | FleetError::SessionNotFound(_) => ErrorClass::NotFound,
        other => match other.category() {
            ErrorCategory::Network => ErrorClass::Network,
            ErrorCategory::Validation => ErrorClass::Validation,
            ErrorCategory::Resource => ErrorClass::NotFound,
            _ => ErrorClass::Other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_metrics::NoopMetricsSink;
    use fleet_testutil::{FakeClock, FakePageHandle};

    fn executor() -> ActionExecutor {
        ActionExecutor::new(
            ExecutorConfig::default(),
            Arc::new(EventBus::new()),
            Arc::new(FakeClock::new(chrono::Utc::now())),
            Arc::new(NoopMetricsSink),
        )
    }

    #[tokio::test]
    async fn invalid_action_short_circuits_before_dispatch() {
        let executor = executor();
        let page = FakePageHandle::default();
        let result = executor.execute(&page, Action::Click { selector: String::new() }, "s1", "c1").await;
        assert!(!result.success);
        assert_eq!(result.error_class, Some(ErrorClass::Validation));
        assert!(page.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn successful_click_dispatches_and_records_history() {
        let executor = executor();
        let page = FakePageHandle::default();
        let result = executor.execute(&page, Action::Click { selector: "#go".into() }, "s1", "c1").await;
        assert!(result.success);
        assert!(result.invariant_holds());
        assert_eq!(executor.history().aggregate("s1", "c1").count, 1);
    }

    #[tokio::test]
    async fn navigate_invokes_page_navigate_with_url() {
        let executor = executor();
        let page = FakePageHandle::default();
        let result = executor
            .execute(&page, Action::Navigate { url: "https://example.com".into(), timeout: None }, "s1", "c1")
            .await;
        assert!(result.success);
        assert!(page.calls.lock().iter().any(|c| c.starts_with("navigate:https://example.com")));
    }
}
