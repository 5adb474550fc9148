//! ApiKey: a persisted credential. The plaintext key is observable exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// First few chars of the plaintext key, kept in the clear for fast lookup.
    pub prefix: String,
    /// Salted hash of the remainder. The plaintext itself is never stored.
    pub hash: String,
    pub roles: HashSet<String>,
    pub scopes: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub metadata: HashMap<String, String>,
}

impl ApiKey {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map(|exp| now < exp).unwrap_or(true)
    }
}

/// Returned exactly once, at creation, alongside the persisted `ApiKey` record.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub record: ApiKey,
    pub plaintext: String,
}
