//! Page: the runtime object inside a browser corresponding to one context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub context_id: String,
    pub session_id: String,
    pub browser_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Page {
    pub fn new(
        context_id: impl Into<String>,
        session_id: impl Into<String>,
        browser_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            context_id: context_id.into(),
            session_id: session_id.into(),
            browser_id: browser_id.into(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}
