//! AcquisitionRequest: a waiter for a browser, and the outcomes of `acquire`.

use chrono::{DateTime, Utc};

/// Single parameter-object shape for acquisition, per the open question in spec.md §9.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub session_id: String,
    pub priority: i32,
    pub deadline: DateTime<Utc>,
}

impl AcquireRequest {
    pub fn new(session_id: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            priority: 0,
            deadline,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquisitionFailure {
    #[error("acquire timed out waiting for a browser")]
    Timeout,
    #[error("pool is unavailable: {0}")]
    Unavailable(String),
}
