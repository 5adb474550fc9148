//! TTL sweeper. Grounded on `fleet-pool`'s `HealthMonitor::spawn` background-task
//! pattern: a `tokio::spawn` loop ticking on a `tokio::time::interval`, stopped
//! via `stop()` or `Drop`. Kept backend-agnostic — it only ever calls
//! `SessionStore::evict_expired`, so an `InMemorySessionStore` and a
//! `RedisSessionStore` share the same sweep loop.

use fleet_types::ports::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Sweeper {
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(store: Arc<dyn SessionStore>, interval: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.evict_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::debug!(evicted = count, "session sweep evicted expired sessions");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "session sweep failed"),
                }
            }
        });
        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use fleet_testutil::FakeClock;
    use fleet_types::session::{Principal, Session};
    use std::collections::HashSet;

    #[tokio::test]
    async fn sweep_evicts_expired_sessions_on_a_tick() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));

        let principal = Principal { user_id: "u1".into(), display_name: "alice".into(), roles: HashSet::new() };
        let session = Session::new(principal, chrono::Duration::milliseconds(10), now);
        store.create(session.clone()).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));

        let sweeper = Sweeper::spawn(store.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.stop();

        assert_eq!(store.count_for_user("u1").await.unwrap(), 0);
    }
}
