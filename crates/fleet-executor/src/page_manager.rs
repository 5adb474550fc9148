//! Maps `(session_id, context_id) -> Page`, per spec.md §4.6. Resolves lazily:
//! acquires a browser from the pool on first use in a session, then creates
//! one page per context inside it. Closing a session releases its browser and
//! every one of its pages; closing a context closes only that context's page.

use fleet_pool::BrowserPool;
use fleet_types::acquisition::AcquireRequest;
use fleet_types::error::{FleetError, Result};
use fleet_types::page::Page;
use fleet_types::ports::{Clock, PageHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct SessionEntry {
    browser_id: String,
    contexts: HashMap<String, (Page, Arc<dyn PageHandle>)>,
}

/// Owns no pages itself; every page lives inside a pool-owned browser and is
/// reclaimed when the session's browser is released back to the pool.
pub struct PageManager {
    pool: Arc<BrowserPool>,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl PageManager {
    pub fn new(pool: Arc<BrowserPool>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock, sessions: Mutex::new(HashMap::new()) }
    }

    /// Returns the page for `(session_id, context_id)`, creating it (and, if
    /// needed, acquiring a browser for the session) on first use.
    pub async fn resolve(&self, session_id: &str, context_id: &str, priority: i32) -> Result<Arc<dyn PageHandle>> {
        let mut sessions = self.sessions.lock().await;

        if let Some(entry) = sessions.get(session_id) {
            if let Some((_, handle)) = entry.contexts.get(context_id) {
                return Ok(handle.clone());
            }
        }

        let browser_id = match sessions.get(session_id) {
            Some(entry) => entry.browser_id.clone(),
            None => {
                let deadline = self.clock.now() + chrono::Duration::seconds(30);
                let request = AcquireRequest::new(session_id, deadline).with_priority(priority);
                let instance = self
                    .pool
                    .acquire(request)
                    .await
                    .map_err(|e| FleetError::PoolUnavailable(e.to_string()))?;
                tracing::debug!(session_id, browser_id = %instance.id, "acquired browser for session");
                sessions.insert(
                    session_id.to_string(),
                    SessionEntry { browser_id: instance.id.clone(), contexts: HashMap::new() },
                );
                instance.id
            }
        };

        let boxed = self.pool.new_page(&browser_id).await?;
        let handle: Arc<dyn PageHandle> = Arc::from(boxed);
        let page = Page::new(context_id, session_id, browser_id.as_str(), self.clock.now());

        let entry = sessions.get_mut(session_id).expect("just inserted or already present");
        entry.contexts.insert(context_id.to_string(), (page, handle.clone()));
        Ok(handle)
    }

    /// Closes every page belonging to `session_id` and releases its browser.
    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        let entry = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(session_id)
        };
        let Some(entry) = entry else { return Ok(()) };

        for (_, (_, handle)) in entry.contexts {
            let _ = handle.close().await;
        }
        self.pool.release(&entry.browser_id, session_id).await
    }

    /// Closes only the page belonging to `context_id`, leaving the session's
    /// browser and its other contexts untouched.
    pub async fn close_context(&self, session_id: &str, context_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let Some(entry) = sessions.get_mut(session_id) else { return Ok(()) };
        if let Some((_, handle)) = entry.contexts.remove(context_id) {
            handle.close().await?;
        }
        Ok(())
    }

    pub async fn page_count(&self, session_id: &str) -> usize {
        self.sessions.lock().await.get(session_id).map(|e| e.contexts.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_metrics::NoopMetricsSink;
    use fleet_pool::PoolConfig;
    use fleet_testutil::{FakeClock, FakeDriver};

    async fn pool() -> Arc<BrowserPool> {
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        Arc::new(
            BrowserPool::new(PoolConfig::default(), Arc::new(FakeDriver::new()), clock, Arc::new(NoopMetricsSink))
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn resolving_twice_for_same_context_reuses_the_page() {
        let pool = pool().await;
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let manager = PageManager::new(pool, clock);
        let first = manager.resolve("s1", "c1", 0).await.unwrap();
        let second = manager.resolve("s1", "c1", 0).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn second_context_in_same_session_reuses_the_browser_but_gets_its_own_page() {
        let pool = pool().await;
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let manager = PageManager::new(pool, clock);
        manager.resolve("s1", "c1", 0).await.unwrap();
        manager.resolve("s1", "c2", 0).await.unwrap();
        assert_eq!(manager.page_count("s1").await, 2);
    }

    #[tokio::test]
    async fn closing_context_leaves_session_and_other_contexts_intact() {
        let pool = pool().await;
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let manager = PageManager::new(pool, clock);
        manager.resolve("s1", "c1", 0).await.unwrap();
        manager.resolve("s1", "c2", 0).await.unwrap();
        manager.close_context("s1", "c1").await.unwrap();
        assert_eq!(manager.page_count("s1").await, 1);
    }

    #[tokio::test]
    async fn closing_session_drops_all_its_contexts() {
        let pool = pool().await;
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let manager = PageManager::new(pool, clock);
        manager.resolve("s1", "c1", 0).await.unwrap();
        manager.close_session("s1").await.unwrap();
        assert_eq!(manager.page_count("s1").await, 0);
    }
}
