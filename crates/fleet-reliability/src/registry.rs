//! Holds every named breaker in the process. Grounded on spec.md §4.4's "a registry
//! holds named breakers and supports bulk reset and status export."

use crate::circuit_breaker::CircuitBreaker;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleet_events::EventBus;
use fleet_types::circuit::{CircuitConfig, CircuitSnapshot};
use std::sync::Arc;

pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    events: Option<Arc<EventBus>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
            events: None,
        }
    }

    pub fn with_events(events: Arc<EventBus>) -> Self {
        Self {
            breakers: DashMap::new(),
            events: Some(events),
        }
    }

    /// Returns the named breaker, creating it from `config` on first use.
    pub fn get_or_create(
        &self,
        name: &str,
        config: CircuitConfig,
        now: DateTime<Utc>,
    ) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.clone();
        }
        let mut breaker = CircuitBreaker::new(name, config, now);
        if let Some(events) = &self.events {
            breaker = breaker.with_events(events.clone());
        }
        let breaker = Arc::new(breaker);
        self.breakers
            .entry(name.to_string())
            .or_insert(breaker)
            .clone()
    }

    pub async fn reset_all(&self, now: DateTime<Utc>) {
        for entry in self.breakers.iter() {
            entry.value().reset(now).await;
        }
    }

    pub async fn status_export(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots = Vec::with_capacity(self.breakers.len());
        for entry in self.breakers.iter() {
            snapshots.push(entry.value().snapshot().await);
        }
        snapshots
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::circuit::presets;

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_name() {
        let registry = CircuitBreakerRegistry::new();
        let now = Utc::now();
        let a = registry.get_or_create("browser.acquire", presets::browser_launch(), now);
        let b = registry.get_or_create("browser.acquire", presets::permissive(), now);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn reset_all_clears_every_breaker() {
        let registry = CircuitBreakerRegistry::new();
        let now = Utc::now();
        let cb = registry.get_or_create("page.navigate", presets::page_navigate(), now);
        for _ in 0..5 {
            cb.on_failure(now).await;
        }
        registry.reset_all(now).await;
        let snapshots = registry.status_export().await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].failure_count, 0);
    }
}
