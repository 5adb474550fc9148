//! A single named circuit breaker.
//!
//! Grounded on the teacher's `riptide-reliability::circuit_breaker` phase-based
//! locking pattern: state is mutated behind a short-lived `tokio::sync::Mutex`
//! guard, and events are emitted only after the guard is dropped, so no lock is
//! ever held across an `.await`.

use chrono::{DateTime, Utc};
use fleet_events::{names, DomainEvent, EventBus, EventSeverity};
use fleet_types::circuit::{CircuitConfig, CircuitSnapshot, CircuitState};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Outcome {
    at: DateTime<Utc>,
    success: bool,
}

struct Inner {
    state: CircuitState,
    window: VecDeque<Outcome>,
    consecutive_successes: u32,
    last_state_change: DateTime<Utc>,
    current_timeout: chrono::Duration,
    consecutive_opens: u32,
}

/// What the caller should do given the breaker's current disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    inner: Mutex<Inner>,
    events: Option<Arc<EventBus>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig, now: DateTime<Utc>) -> Self {
        let current_timeout = chrono::Duration::from_std(config.open_timeout).unwrap_or_default();
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: VecDeque::new(),
                consecutive_successes: 0,
                last_state_change: now,
                current_timeout,
                consecutive_opens: 0,
            }),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admits the next call, transitioning Open->HalfOpen first if the timeout
    /// has elapsed, and returning `Allow` for the probe that triggers HalfOpen.
    pub async fn try_admit(&self, now: DateTime<Utc>) -> Admission {
        let mut guard = self.inner.lock().await;
        match guard.state {
            CircuitState::Closed => Admission::Allow,
            CircuitState::HalfOpen => Admission::Reject,
            CircuitState::Open => {
                let elapsed = now - guard.last_state_change;
                if elapsed >= guard.current_timeout {
                    guard.state = CircuitState::HalfOpen;
                    guard.last_state_change = now;
                    guard.consecutive_successes = 0;
                    drop(guard);
                    self.emit(CircuitState::HalfOpen, now).await;
                    Admission::Allow
                } else {
                    Admission::Reject
                }
            }
        }
    }

    pub async fn on_success(&self, now: DateTime<Utc>) {
        let transitioned = {
            let mut guard = self.inner.lock().await;
            self.prune(&mut guard, now);

            match guard.state {
                CircuitState::HalfOpen => {
                    guard.consecutive_successes += 1;
                    if guard.consecutive_successes >= self.config.success_threshold {
                        guard.state = CircuitState::Closed;
                        guard.last_state_change = now;
                        guard.window.clear();
                        guard.consecutive_opens = 0;
                        guard.current_timeout =
                            chrono::Duration::from_std(self.config.open_timeout).unwrap_or_default();
                        Some(CircuitState::Closed)
                    } else {
                        None
                    }
                }
                CircuitState::Closed => {
                    guard.window.push_back(Outcome { at: now, success: true });
                    None
                }
                CircuitState::Open => None,
            }
        };

        if let Some(state) = transitioned {
            self.emit(state, now).await;
        }
    }

    pub async fn on_failure(&self, now: DateTime<Utc>) {
        let transitioned = {
            let mut guard = self.inner.lock().await;
            self.prune(&mut guard, now);

            match guard.state {
                CircuitState::HalfOpen => {
                    guard.consecutive_opens += 1;
                    guard.state = CircuitState::Open;
                    guard.last_state_change = now;
                    guard.current_timeout = self.backed_off_timeout(guard.consecutive_opens);
                    Some(CircuitState::Open)
                }
                CircuitState::Closed => {
                    guard.window.push_back(Outcome { at: now, success: false });
                    let total = guard.window.len() as u32;
                    let failures = guard.window.iter().filter(|o| !o.success).count() as u32;
                    if total >= self.config.minimum_throughput
                        && failures >= self.config.failure_threshold
                    {
                        guard.consecutive_opens += 1;
                        guard.state = CircuitState::Open;
                        guard.last_state_change = now;
                        guard.current_timeout = self.backed_off_timeout(guard.consecutive_opens);
                        Some(CircuitState::Open)
                    } else {
                        None
                    }
                }
                CircuitState::Open => None,
            }
        };

        if let Some(state) = transitioned {
            self.emit(state, now).await;
        }
    }

    fn backed_off_timeout(&self, consecutive_opens: u32) -> chrono::Duration {
        let base = self.config.open_timeout;
        let max = self.config.max_timeout;
        if !self.config.exponential_backoff || consecutive_opens <= 1 {
            return chrono::Duration::from_std(base).unwrap_or_default();
        }
        let factor = 1u32 << (consecutive_opens - 1).min(16);
        let scaled = base.saturating_mul(factor).min(max);
        chrono::Duration::from_std(scaled).unwrap_or_default()
    }

    fn prune(&self, guard: &mut Inner, now: DateTime<Utc>) {
        let window = chrono::Duration::from_std(self.config.rolling_window).unwrap_or_default();
        while let Some(front) = guard.window.front() {
            if now - front.at > window {
                guard.window.pop_front();
            } else {
                break;
            }
        }
    }

    pub async fn snapshot(&self) -> CircuitSnapshot {
        let guard = self.inner.lock().await;
        let failure_count = guard.window.iter().filter(|o| !o.success).count() as u64;
        let success_count = guard.window.iter().filter(|o| o.success).count() as u64;
        CircuitSnapshot {
            name: self.name.clone(),
            state: guard.state,
            current_timeout: guard.current_timeout.to_std().unwrap_or_default(),
            last_state_change: guard.last_state_change,
            failure_count,
            success_count,
            consecutive_opens: guard.consecutive_opens,
        }
    }

    pub async fn reset(&self, now: DateTime<Utc>) {
        let mut guard = self.inner.lock().await;
        guard.state = CircuitState::Closed;
        guard.window.clear();
        guard.consecutive_successes = 0;
        guard.consecutive_opens = 0;
        guard.last_state_change = now;
        guard.current_timeout = chrono::Duration::from_std(self.config.open_timeout).unwrap_or_default();
    }

    async fn emit(&self, state: CircuitState, now: DateTime<Utc>) {
        tracing::info!(breaker = %self.name, state = ?state, "circuit breaker state changed");
        if let Some(events) = &self.events {
            events.emit(DomainEvent::new(
                names::CIRCUIT_STATE_CHANGED,
                self.name.clone(),
                EventSeverity::Warn,
                serde_json::json!({ "state": format!("{:?}", state) }),
                now,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::circuit::presets;

    #[tokio::test]
    async fn opens_after_failure_threshold_with_minimum_throughput() {
        let now = Utc::now();
        let cb = CircuitBreaker::new("test", presets::page_navigate(), now);
        for _ in 0..5 {
            cb.on_failure(now).await;
        }
        assert_eq!(cb.snapshot().await.state, CircuitState::Open);
        assert_eq!(cb.try_admit(now).await, Admission::Reject);
    }

    #[tokio::test]
    async fn admits_single_probe_after_open_timeout_then_closes_on_success() {
        let now = Utc::now();
        let cb = CircuitBreaker::new("test", presets::page_navigate(), now);
        for _ in 0..5 {
            cb.on_failure(now).await;
        }
        assert_eq!(cb.snapshot().await.state, CircuitState::Open);

        let after = now + chrono::Duration::seconds(2); // preset open_timeout is 1s
        assert_eq!(cb.try_admit(after).await, Admission::Allow);
        assert_eq!(cb.snapshot().await.state, CircuitState::HalfOpen);

        for _ in 0..3 {
            cb.on_success(after).await;
        }
        assert_eq!(cb.snapshot().await.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_with_backoff() {
        let now = Utc::now();
        let cb = CircuitBreaker::new("test", presets::page_navigate(), now);
        for _ in 0..5 {
            cb.on_failure(now).await;
        }
        let after = now + chrono::Duration::seconds(2);
        cb.try_admit(after).await;
        cb.on_failure(after).await;
        let snap = cb.snapshot().await;
        assert_eq!(snap.state, CircuitState::Open);
        assert!(snap.current_timeout >= std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn reset_clears_failure_window() {
        let now = Utc::now();
        let cb = CircuitBreaker::new("test", presets::page_navigate(), now);
        for _ in 0..5 {
            cb.on_failure(now).await;
        }
        cb.reset(now).await;
        assert_eq!(cb.snapshot().await.state, CircuitState::Closed);
    }
}
