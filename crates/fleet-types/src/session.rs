//! Session: the authenticated identity anchor shared across protocols.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The authenticated principal a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub display_name: String,
    pub roles: HashSet<String>,
}

/// Free-form metadata carried on a session; capped to keep sessions small in storage.
pub type MetadataBag = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: MetadataBag,
}

/// Fields callers may merge into a session via `update`. Identity (id, principal.user_id)
/// is never mutable through this path.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub display_name: Option<String>,
    pub roles: Option<HashSet<String>>,
    pub metadata: Option<MetadataBag>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub user_id: Option<String>,
    pub active_only: bool,
}

impl Session {
    pub fn new(principal: Principal, ttl: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            principal,
            created_at: now,
            last_access: now,
            expires_at: now + ttl,
            metadata: HashMap::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `lastAccess ≤ expiresAt` and `expiresAt > creation`.
    pub fn invariants_hold(&self) -> bool {
        self.last_access <= self.expires_at && self.expires_at > self.created_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access = now;
    }

    pub fn apply_patch(&mut self, patch: SessionPatch) {
        if let Some(name) = patch.display_name {
            self.principal.display_name = name;
        }
        if let Some(roles) = patch.roles {
            self.principal.roles = roles;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
    }

    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }

    /// A view safe to log or return over the wire: no metadata, no role internals beyond name.
    pub fn sanitized_view(&self) -> SanitizedSession {
        SanitizedSession {
            id: self.id.clone(),
            user_id: self.principal.user_id.clone(),
            username: self.principal.display_name.clone(),
            created_at: self.created_at,
            last_access: self.last_access,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedSession {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            user_id: "u1".into(),
            display_name: "alice".into(),
            roles: HashSet::from(["user".to_string()]),
        }
    }

    #[test]
    fn new_session_satisfies_invariants() {
        let now = Utc::now();
        let s = Session::new(principal(), chrono::Duration::minutes(15), now);
        assert!(s.invariants_hold());
        assert!(!s.is_expired(now));
    }

    #[test]
    fn touch_updates_last_access_without_crossing_expiry() {
        let now = Utc::now();
        let mut s = Session::new(principal(), chrono::Duration::minutes(15), now);
        let later = now + chrono::Duration::minutes(5);
        s.touch(later);
        assert_eq!(s.last_access, later);
        assert!(s.invariants_hold());
    }

    #[test]
    fn patch_never_touches_identity() {
        let now = Utc::now();
        let mut s = Session::new(principal(), chrono::Duration::minutes(15), now);
        let id_before = s.id.clone();
        let user_before = s.principal.user_id.clone();
        s.apply_patch(SessionPatch {
            display_name: Some("alice2".into()),
            ..Default::default()
        });
        assert_eq!(s.id, id_before);
        assert_eq!(s.principal.user_id, user_before);
        assert_eq!(s.principal.display_name, "alice2");
    }

    #[test]
    fn sanitized_view_drops_metadata() {
        let now = Utc::now();
        let mut s = Session::new(principal(), chrono::Duration::minutes(15), now);
        s.metadata.insert("secret".into(), "value".into());
        let view = s.sanitized_view();
        assert_eq!(view.user_id, "u1");
        // SanitizedSession has no metadata field at all — compile-time guarantee.
        let _ = view;
    }
}
