//! Session storage, the TTL sweeper, and cross-replica replication.
//!
//! Two `SessionStore` backends are provided: [`memory::InMemorySessionStore`]
//! for single-process deployments and tests, and [`redis_store::RedisSessionStore`]
//! grounded on the teacher's `RedisSessionStorage` for shared state across
//! instances. [`sweeper::Sweeper`] evicts expired entries on a timer regardless
//! of backend. [`replication::ReplicationManager`] fans writes out to replicas
//! and reconciles drift via `full_sync`.

pub mod config;
pub mod memory;
pub mod redis_store;
pub mod replication;
pub mod sweeper;

pub use config::{ConflictPolicy, ReplicationConfig, SessionStoreConfig};
pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use replication::{ReplicateOp, ReplicationManager, SyncReport};
pub use sweeper::Sweeper;
