//! BrowserInstance: a running browser process bound to the pool.
//!
//! This module owns only the *metadata* side of a browser instance — state, usage
//! counters, health score. The live driver handle is owned by `fleet-pool`, which
//! pairs one of these with a `fleet_types::ports::BrowserHandle`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `idle↔active → {unhealthy, recycling} → disposed`. `disposed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowserState {
    Idle,
    Active,
    Unhealthy,
    Recycling,
    Disposed,
}

impl BrowserState {
    /// Whether `to` is a legal transition from `self` per the state DAG.
    pub fn can_transition_to(self, to: BrowserState) -> bool {
        use BrowserState::*;
        match (self, to) {
            (Disposed, _) => false,
            (Idle, Active) | (Active, Idle) => true,
            (Idle, Unhealthy) | (Active, Unhealthy) => true,
            (Idle, Recycling) | (Active, Recycling) => true,
            (Unhealthy, Disposed) | (Recycling, Disposed) => true,
            // Direct idle/active -> disposed is allowed for shutdown force-close.
            (Idle, Disposed) | (Active, Disposed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserInstance {
    pub id: String,
    pub state: BrowserState,
    pub owning_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: u64,
    pub page_count: u32,
    pub error_count: u32,
    /// Lifetime health score in [0, 100], 100 == perfectly healthy.
    pub health_score: u8,
}

impl BrowserInstance {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: BrowserState::Idle,
            owning_session_id: None,
            created_at: now,
            last_used_at: now,
            use_count: 0,
            page_count: 0,
            error_count: 0,
            health_score: 100,
        }
    }

    /// Attempts a state transition; returns `false` (no-op) if illegal.
    #[must_use]
    pub fn transition(&mut self, to: BrowserState) -> bool {
        if !self.state.can_transition_to(to) {
            return false;
        }
        self.state = to;
        true
    }

    pub fn mark_active(&mut self, session_id: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.transition(BrowserState::Active) {
            return false;
        }
        self.owning_session_id = Some(session_id.into());
        self.last_used_at = now;
        true
    }

    /// Call once per page created. `use_count` tracks pages created over the
    /// instance's life, not acquisitions — see `BrowserPool::new_page`.
    pub fn record_page_created(&mut self) {
        self.use_count += 1;
        self.page_count += 1;
    }

    pub fn mark_idle(&mut self, now: DateTime<Utc>) -> bool {
        if !self.transition(BrowserState::Idle) {
            return false;
        }
        self.owning_session_id = None;
        self.last_used_at = now;
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.state == BrowserState::Disposed
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_used_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposed_is_absorbing() {
        let mut b = BrowserInstance::new(Utc::now());
        assert!(b.transition(BrowserState::Active));
        assert!(b.transition(BrowserState::Unhealthy));
        assert!(b.transition(BrowserState::Disposed));
        assert!(!b.transition(BrowserState::Idle));
        assert!(!b.transition(BrowserState::Active));
        assert!(b.is_disposed());
    }

    #[test]
    fn acquire_release_cycle() {
        let now = Utc::now();
        let mut b = BrowserInstance::new(now);
        assert!(b.mark_active("s1", now));
        assert_eq!(b.owning_session_id.as_deref(), Some("s1"));
        b.record_page_created();
        assert_eq!(b.use_count, 1);
        assert_eq!(b.page_count, 1);
        assert!(b.mark_idle(now));
        assert!(b.owning_session_id.is_none());
    }

    #[test]
    fn cannot_skip_directly_from_unhealthy_to_active() {
        let mut b = BrowserInstance::new(Utc::now());
        assert!(b.transition(BrowserState::Unhealthy));
        assert!(!b.transition(BrowserState::Active));
    }
}
