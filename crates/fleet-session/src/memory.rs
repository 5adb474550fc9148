//! In-memory `SessionStore`. Grounded on `fleet-testutil`'s `FakeSessionStore`
//! convention of backing a port with a `DashMap`, extended with the by-user
//! index and clock-driven TTL invisibility spec.md §4.7 requires.

use async_trait::async_trait;
use dashmap::DashMap;
use fleet_types::error::Result;
use fleet_types::ports::{Clock, SessionStore};
use fleet_types::session::{Session, SessionFilter};
use std::collections::HashSet;
use std::sync::Arc;

pub struct InMemorySessionStore {
    clock: Arc<dyn Clock>,
    sessions: DashMap<String, Session>,
    by_user: DashMap<String, HashSet<String>>,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, sessions: DashMap::new(), by_user: DashMap::new() }
    }

    fn index(&self, user_id: &str, id: &str) {
        self.by_user.entry(user_id.to_string()).or_default().insert(id.to_string());
    }

    fn unindex(&self, user_id: &str, id: &str) {
        if let Some(mut ids) = self.by_user.get_mut(user_id) {
            ids.remove(id);
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<()> {
        self.index(&session.principal.user_id, &session.id);
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let now = self.clock.now();
        Ok(self.sessions.get(id).map(|s| s.clone()).filter(|s| !s.is_expired(now)))
    }

    async fn update(&self, session: Session) -> Result<()> {
        self.index(&session.principal.user_id, &session.id);
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some((_, session)) = self.sessions.remove(id) else {
            return Ok(false);
        };
        self.unindex(&session.principal.user_id, id);
        Ok(true)
    }

    async fn touch(&self, id: &str) -> Result<Option<Session>> {
        let now = self.clock.now();
        if let Some(mut entry) = self.sessions.get_mut(id) {
            if entry.is_expired(now) {
                return Ok(None);
            }
            entry.touch(now);
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let now = self.clock.now();
        let ids: Vec<String> = match &filter.user_id {
            Some(user_id) => self.by_user.get(user_id).map(|s| s.iter().cloned().collect()).unwrap_or_default(),
            None => self.sessions.iter().map(|e| e.key().clone()).collect(),
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| self.sessions.get(&id).map(|s| s.clone()))
            .filter(|s| !filter.active_only || !s.is_expired(now))
            .collect())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<usize> {
        Ok(self.by_user.get(user_id).map(|ids| ids.len()).unwrap_or(0))
    }

    async fn evict_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let expired: Vec<(String, String)> = self
            .sessions
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| (e.key().clone(), e.value().principal.user_id.clone()))
            .collect();
        let count = expired.len();
        for (id, user_id) in expired {
            self.sessions.remove(&id);
            self.unindex(&user_id, &id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testutil::FakeClock;
    use fleet_types::session::Principal;
    use std::collections::HashSet as Set;

    fn principal(user_id: &str) -> Principal {
        Principal { user_id: user_id.into(), display_name: "alice".into(), roles: Set::new() }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let now = chrono::Utc::now();
        let store = InMemorySessionStore::new(Arc::new(FakeClock::new(now)));
        let s = Session::new(principal("u1"), chrono::Duration::minutes(15), now);
        let id = s.id.clone();
        store.create(s.clone()).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn get_hides_expired_sessions() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let store = InMemorySessionStore::new(clock.clone());
        let s = Session::new(principal("u1"), chrono::Duration::seconds(1), now);
        let id = s.id.clone();
        store.create(s).await.unwrap();
        clock.advance(chrono::Duration::seconds(2));
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_from_user_index() {
        let now = chrono::Utc::now();
        let store = InMemorySessionStore::new(Arc::new(FakeClock::new(now)));
        let s = Session::new(principal("u1"), chrono::Duration::minutes(15), now);
        let id = s.id.clone();
        store.create(s).await.unwrap();
        assert_eq!(store.count_for_user("u1").await.unwrap(), 1);
        assert!(store.delete(&id).await.unwrap());
        assert_eq!(store.count_for_user("u1").await.unwrap(), 0);
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn evict_expired_removes_index_entries_too() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let store = InMemorySessionStore::new(clock.clone());
        let s = Session::new(principal("u1"), chrono::Duration::seconds(1), now);
        store.create(s).await.unwrap();
        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(store.evict_expired().await.unwrap(), 1);
        assert_eq!(store.count_for_user("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_filters_by_active_only() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let store = InMemorySessionStore::new(clock.clone());
        store.create(Session::new(principal("u1"), chrono::Duration::seconds(1), now)).await.unwrap();
        store.create(Session::new(principal("u1"), chrono::Duration::minutes(15), now)).await.unwrap();
        clock.advance(chrono::Duration::seconds(2));
        let active = store.list(&SessionFilter { user_id: Some("u1".into()), active_only: true }).await.unwrap();
        assert_eq!(active.len(), 1);
    }
}
