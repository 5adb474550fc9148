//! Circuit breaker configuration and state data model.
//!
//! Grounded on the teacher's `riptide-reliability` `CircuitBreakerState` enum and
//! `riptide-types::reliability::CircuitBreakerConfig`, extended with the rolling
//! windows and throughput-floor fields spec.md §4.4 calls for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub rolling_window: Duration,
    pub open_timeout: Duration,
    pub max_timeout: Duration,
    pub minimum_throughput: u32,
    pub exponential_backoff: bool,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            rolling_window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
            minimum_throughput: 1,
            exponential_backoff: true,
        }
    }
}

pub mod presets {
    use super::*;

    pub fn http_external() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
            ..Default::default()
        }
    }

    pub fn browser_launch() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_timeout: Duration::from_secs(15),
            max_timeout: Duration::from_secs(120),
            minimum_throughput: 1,
            ..Default::default()
        }
    }

    pub fn page_navigate() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(1),
            max_timeout: Duration::from_secs(60),
            minimum_throughput: 1,
            ..Default::default()
        }
    }

    pub fn aggressive() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 2,
            success_threshold: 1,
            open_timeout: Duration::from_secs(5),
            max_timeout: Duration::from_secs(60),
            ..Default::default()
        }
    }

    pub fn permissive() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 20,
            success_threshold: 5,
            open_timeout: Duration::from_secs(120),
            max_timeout: Duration::from_secs(900),
            minimum_throughput: 5,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub current_timeout: Duration,
    pub last_state_change: DateTime<Utc>,
    pub failure_count: u64,
    pub success_count: u64,
    pub consecutive_opens: u32,
}
