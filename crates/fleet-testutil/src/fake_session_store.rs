use async_trait::async_trait;
use dashmap::DashMap;
use fleet_types::error::Result;
use fleet_types::ports::SessionStore;
use fleet_types::session::{Session, SessionFilter};

/// An in-memory `SessionStore`. Grounded on the teacher's in-memory adapter
/// convention of backing a port with a `DashMap` instead of a mock.
#[derive(Default)]
pub struct FakeSessionStore {
    sessions: DashMap<String, Session>,
}

impl FakeSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for FakeSessionStore {
    async fn create(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn update(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }

    async fn touch(&self, id: &str) -> Result<Option<Session>> {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.touch(chrono::Utc::now());
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let now = chrono::Utc::now();
        Ok(self
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| {
                filter
                    .user_id
                    .as_ref()
                    .map(|uid| &s.principal.user_id == uid)
                    .unwrap_or(true)
            })
            .filter(|s| !filter.active_only || !s.is_expired(now))
            .collect())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.value().principal.user_id == user_id)
            .count())
    }

    async fn evict_expired(&self) -> Result<usize> {
        let now = chrono::Utc::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        let count = expired.len();
        for id in expired {
            self.sessions.remove(&id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::session::Principal;
    use std::collections::HashSet;

    fn session() -> Session {
        Session::new(
            Principal {
                user_id: "u1".into(),
                display_name: "alice".into(),
                roles: HashSet::new(),
            },
            chrono::Duration::minutes(15),
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = FakeSessionStore::new();
        let s = session();
        let id = s.id.clone();
        store.create(s).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = FakeSessionStore::new();
        let s = session();
        let id = s.id.clone();
        store.create(s).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
    }
}
