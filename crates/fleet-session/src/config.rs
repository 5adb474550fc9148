use std::time::Duration;

/// Grounded on the teacher's `RedisSessionStorage` key/TTL conventions, per
/// spec.md §4.7.
#[derive(Clone, Debug)]
pub struct SessionStoreConfig {
    /// How far past a session's own TTL the per-user index entry is kept
    /// alive, so a `listByUser` running just before expiry doesn't race a
    /// vanished key.
    pub user_index_ttl_buffer: chrono::Duration,
    pub sweep_interval: Duration,
    pub sweep_batch_size: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            user_index_ttl_buffer: chrono::Duration::hours(1),
            sweep_interval: Duration::from_secs(60),
            sweep_batch_size: 100,
        }
    }
}

/// Grounded on the teacher's `RetryPolicy` (`riptide-utils::retry`), adapted
/// to decorrelated jitter per spec.md §4.8.
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive replicate failures before a replica is marked degraded.
    pub degrade_after_failures: u32,
    pub full_sync_interval: Duration,
    pub conflict_policy: ConflictPolicy,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            degrade_after_failures: 5,
            full_sync_interval: Duration::from_secs(300),
            conflict_policy: ConflictPolicy::LastWriteWins,
        }
    }
}

/// Resolution applied to ids present on a replica but absent from the primary
/// during `full_sync`, per spec.md §4.8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The primary's current absence of the id is treated as authoritative;
    /// the replica's copy is deleted.
    LastWriteWins,
    /// The replica's copy is left in place.
    OldestWins,
    /// Nothing is mutated; a conflict event is emitted per divergent id.
    Manual,
}
