//! Context: a logical browser environment bound to exactly one session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
}

/// Declared capabilities a context asks its page to have.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub viewport: Option<Viewport>,
    pub user_agent: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub geolocation: Option<Geolocation>,
    pub permissions: Vec<String>,
    pub javascript_enabled: bool,
    pub bypass_csp: bool,
    pub extra_headers: HashMap<String, String>,
    pub http_credentials: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextStatus {
    Active,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub session_id: String,
    pub capabilities: Capabilities,
    pub status: ContextStatus,
}

impl Context {
    pub fn new(session_id: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            capabilities,
            status: ContextStatus::Active,
        }
    }

    /// A terminated context is never reused.
    pub fn terminate(&mut self) {
        self.status = ContextStatus::Terminated;
    }

    pub fn is_active(&self) -> bool {
        self.status == ContextStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated_context_stays_terminated() {
        let mut ctx = Context::new("s1", Capabilities::default());
        assert!(ctx.is_active());
        ctx.terminate();
        assert!(!ctx.is_active());
        ctx.terminate(); // idempotent
        assert!(!ctx.is_active());
    }
}
