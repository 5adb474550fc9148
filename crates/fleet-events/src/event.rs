//! Grounded on the teacher's `riptide-types::ports::events::DomainEvent`: an
//! immutable, serializable fact with an event-type string and a JSON payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

/// A single fact emitted by the pool, circuit breakers, session replication,
/// or the auth layer. Named in past tense, e.g. `pool.browser_checked_out`,
/// `auth.token_refreshed`, `session.replica_conflict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub severity: EventSeverity,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl DomainEvent {
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        severity: EventSeverity,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            severity,
            payload,
            timestamp: now,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) => self.event_type.starts_with(prefix),
            None => self.event_type == pattern,
        }
    }
}

/// Names for the events this workspace emits. Kept as plain strings (not an
/// enum) so adapters can match on patterns like `"pool.*"`, per the teacher's
/// `EventRouting::PatternBased`.
pub mod names {
    pub const POOL_BROWSER_LAUNCHED: &str = "pool.browser_launched";
    pub const POOL_BROWSER_CHECKED_OUT: &str = "pool.browser_checked_out";
    pub const POOL_BROWSER_CHECKED_IN: &str = "pool.browser_checked_in";
    pub const POOL_BROWSER_RECYCLED: &str = "pool.browser_recycled";
    pub const POOL_BROWSER_DISPOSED: &str = "pool.browser_disposed";
    pub const POOL_ACQUIRE_TIMEOUT: &str = "pool.acquire_timeout";
    pub const CIRCUIT_STATE_CHANGED: &str = "circuit.state_changed";
    pub const SESSION_REPLICA_CONFLICT: &str = "session.replica_conflict";
    pub const SESSION_REPLICA_DEGRADED: &str = "session.replica_degraded";
    pub const SESSION_REPLICA_RECOVERED: &str = "session.replica_recovered";
    pub const AUTH_TOKEN_REFRESHED: &str = "auth.token_refreshed";
    pub const AUTH_API_KEY_ISSUED: &str = "auth.api_key_issued";
    pub const SECURITY_ANOMALY: &str = "security.anomaly";
    pub const SECURITY_AUTH_FAILURE: &str = "security.auth_failure";
    pub const SECURITY_RATE_LIMIT_EXCEEDED: &str = "security.rate_limit_exceeded";
    pub const ACTION_EXECUTED: &str = "action.executed";
    pub const ACTION_VALIDATION_FAILED: &str = "action.validation_failed";
    pub const PAGE_OPENED: &str = "page.opened";
    pub const PAGE_CLOSED: &str = "page.closed";
}
