//! Session replication: primary writes fan out to replicas with
//! decorrelated-jitter retry, and `full_sync` reconciles drift. Grounded on
//! the teacher's `RetryPolicy` (`riptide-utils::retry`) for the retry shape,
//! adapted from fixed exponential backoff to the decorrelated jitter spec.md
//! §4.8 calls for (`sleep = min(cap, random_between(base, prev * 3))`, per
//! Marc Brooker's "Exponential Backoff And Jitter").

use crate::config::{ConflictPolicy, ReplicationConfig};
use fleet_events::{names, DomainEvent, EventBus, EventSeverity};
use fleet_types::error::Result;
use fleet_types::ports::{Clock, SessionStore};
use fleet_types::session::{Session, SessionFilter};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One fact to propagate to every replica.
#[derive(Clone, Debug)]
pub enum ReplicateOp {
    Create(Session),
    Update(Session),
    Delete(String),
}

struct ReplicaState {
    store: Arc<dyn SessionStore>,
    consecutive_failures: AtomicU32,
    degraded: AtomicBool,
}

/// Outcome of one `full_sync` pass against a single replica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: usize,
    pub removed: usize,
    pub conflicts: usize,
}

pub struct ReplicationManager {
    primary: Arc<dyn SessionStore>,
    replicas: Vec<Arc<ReplicaState>>,
    config: ReplicationConfig,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl ReplicationManager {
    pub fn new(
        primary: Arc<dyn SessionStore>,
        replicas: Vec<Arc<dyn SessionStore>>,
        config: ReplicationConfig,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        let replicas = replicas
            .into_iter()
            .map(|store| Arc::new(ReplicaState { store, consecutive_failures: AtomicU32::new(0), degraded: AtomicBool::new(false) }))
            .collect();
        Self { primary, replicas, config, clock, events }
    }

    /// Writes to the primary then fans `op` out to every replica, retrying
    /// each with decorrelated jitter. A replica that exhausts its retries is
    /// marked degraded; the call to the primary still succeeds.
    pub async fn apply(&self, op: ReplicateOp) -> Result<()> {
        self.apply_to_primary(&op).await?;
        for replica in &self.replicas {
            self.replicate_with_retry(replica.clone(), op.clone()).await;
        }
        Ok(())
    }

    async fn apply_to_primary(&self, op: &ReplicateOp) -> Result<()> {
        match op {
            ReplicateOp::Create(s) => self.primary.create(s.clone()).await,
            ReplicateOp::Update(s) => self.primary.update(s.clone()).await,
            ReplicateOp::Delete(id) => self.primary.delete(id).await.map(|_| ()),
        }
    }

    async fn replicate_with_retry(&self, replica: Arc<ReplicaState>, op: ReplicateOp) {
        let mut delay = self.config.base_delay;
        for attempt in 0..=self.config.max_retries {
            let outcome = match &op {
                ReplicateOp::Create(s) => replica.store.create(s.clone()).await,
                ReplicateOp::Update(s) => replica.store.update(s.clone()).await,
                ReplicateOp::Delete(id) => replica.store.delete(id).await.map(|_| ()),
            };

            match outcome {
                Ok(()) => {
                    let was_degraded = replica.degraded.swap(false, Ordering::SeqCst);
                    replica.consecutive_failures.store(0, Ordering::SeqCst);
                    if was_degraded {
                        self.events.emit(DomainEvent::new(
                            names::SESSION_REPLICA_RECOVERED,
                            "replica",
                            EventSeverity::Info,
                            serde_json::json!({ "attempt": attempt }),
                            self.clock.now(),
                        ));
                    }
                    return;
                }
                Err(e) => {
                    if attempt == self.config.max_retries {
                        let failures = replica.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                        tracing::warn!(error = %e, consecutive_failures = failures, "replication attempt exhausted");
                        if failures >= self.config.degrade_after_failures
                            && !replica.degraded.swap(true, Ordering::SeqCst)
                        {
                            self.events.emit(DomainEvent::new(
                                names::SESSION_REPLICA_DEGRADED,
                                "replica",
                                EventSeverity::Error,
                                serde_json::json!({ "consecutive_failures": failures }),
                                self.clock.now(),
                            ));
                        }
                        return;
                    }
                    tokio::time::sleep(delay).await;
                    delay = decorrelated_jitter(self.config.base_delay, delay, self.config.max_delay);
                }
            }
        }
    }

    /// Reconciles one replica against the primary's current session set.
    /// Ids present on the primary but missing from the replica are always
    /// pushed. Ids present only on the replica ("extras") are resolved per
    /// `ConflictPolicy`.
    pub async fn full_sync(&self, replica_index: usize) -> Result<SyncReport> {
        let replica = self.replicas[replica_index].clone();
        let primary_sessions = self.primary.list(&SessionFilter::default()).await?;
        let replica_sessions = replica.store.list(&SessionFilter::default()).await?;

        let primary_ids: std::collections::HashSet<&str> = primary_sessions.iter().map(|s| s.id.as_str()).collect();
        let replica_ids: std::collections::HashSet<&str> = replica_sessions.iter().map(|s| s.id.as_str()).collect();

        let mut report = SyncReport::default();

        for session in &primary_sessions {
            if !replica_ids.contains(session.id.as_str()) {
                replica.store.create(session.clone()).await?;
                report.pushed += 1;
            }
        }

        let extras: Vec<&Session> = replica_sessions.iter().filter(|s| !primary_ids.contains(s.id.as_str())).collect();
        match self.config.conflict_policy {
            ConflictPolicy::LastWriteWins => {
                for session in extras {
                    replica.store.delete(&session.id).await?;
                    report.removed += 1;
                }
            }
            ConflictPolicy::OldestWins => {}
            ConflictPolicy::Manual => {
                for session in extras {
                    self.events.emit(DomainEvent::new(
                        names::SESSION_REPLICA_CONFLICT,
                        session.id.clone(),
                        EventSeverity::Warn,
                        serde_json::json!({ "reason": "present_on_replica_absent_on_primary" }),
                        self.clock.now(),
                    ));
                    report.conflicts += 1;
                }
            }
        }

        Ok(report)
    }

    /// Spawns a background loop running `full_sync` against every replica on
    /// `ReplicationConfig::full_sync_interval`, mirroring `fleet-pool`'s
    /// `HealthMonitor::spawn` ticker pattern.
    pub fn spawn_full_sync_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.full_sync_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for i in 0..self.replicas.len() {
                    if let Err(e) = self.full_sync(i).await {
                        tracing::warn!(error = %e, replica = i, "full sync failed");
                    }
                }
            }
        })
    }
}

/// AWS-style decorrelated jitter: `sleep = min(cap, random_between(base, prev * 3))`.
fn decorrelated_jitter(base: Duration, prev: Duration, cap: Duration) -> Duration {
    let upper = (prev.as_millis() as u64 * 3).max(base.as_millis() as u64);
    let jittered = fastrand::u64(base.as_millis() as u64..=upper);
    Duration::from_millis(jittered).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use fleet_testutil::FakeClock;
    use fleet_types::session::Principal;
    use std::collections::HashSet;

    fn principal(user_id: &str) -> Principal {
        Principal { user_id: user_id.into(), display_name: "alice".into(), roles: HashSet::new() }
    }

    fn session(id: &str, now: chrono::DateTime<chrono::Utc>) -> Session {
        let mut s = Session::new(principal("u1"), chrono::Duration::minutes(15), now);
        s.id = id.to_string();
        s
    }

    #[tokio::test]
    async fn apply_fans_out_create_to_every_replica() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let primary: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let replica: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let events = Arc::new(EventBus::new());

        let manager = ReplicationManager::new(
            primary.clone(),
            vec![replica.clone()],
            ReplicationConfig::default(),
            clock,
            events,
        );

        let s = session("a", now);
        manager.apply(ReplicateOp::Create(s.clone())).await.unwrap();

        assert_eq!(primary.get("a").await.unwrap(), Some(s.clone()));
        assert_eq!(replica.get("a").await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn full_sync_under_last_write_wins_pushes_missing_and_deletes_extra() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let primary: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let replica: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let events = Arc::new(EventBus::new());

        primary.create(session("a", now)).await.unwrap();
        primary.create(session("b", now)).await.unwrap();
        replica.create(session("b", now)).await.unwrap();
        replica.create(session("c", now)).await.unwrap();

        let manager = ReplicationManager::new(
            primary.clone(),
            vec![replica.clone()],
            ReplicationConfig { conflict_policy: ConflictPolicy::LastWriteWins, ..ReplicationConfig::default() },
            clock,
            events,
        );

        let report = manager.full_sync(0).await.unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(report.removed, 1);

        let ids: std::collections::HashSet<String> =
            replica.list(&SessionFilter::default()).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, std::collections::HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn full_sync_under_manual_policy_leaves_replica_untouched_and_emits_conflicts() {
        let now = chrono::Utc::now();
        let clock = Arc::new(FakeClock::new(now));
        let primary: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let replica: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(clock.clone()));
        let events = Arc::new(EventBus::new());

        primary.create(session("a", now)).await.unwrap();
        replica.create(session("a", now)).await.unwrap();
        replica.create(session("c", now)).await.unwrap();

        let manager = ReplicationManager::new(
            primary,
            vec![replica.clone()],
            ReplicationConfig { conflict_policy: ConflictPolicy::Manual, ..ReplicationConfig::default() },
            clock,
            events,
        );

        let report = manager.full_sync(0).await.unwrap();
        assert_eq!(report.pushed, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(report.conflicts, 1);
        assert!(replica.get("c").await.unwrap().is_some());
    }

    #[test]
    fn decorrelated_jitter_never_exceeds_cap() {
        let cap = Duration::from_millis(100);
        let mut prev = Duration::from_millis(10);
        for _ in 0..50 {
            prev = decorrelated_jitter(Duration::from_millis(10), prev, cap);
            assert!(prev <= cap);
        }
    }
}
