//! Redis-backed `SessionStore`. Grounded directly on the teacher's
//! `RedisSessionStorage` (`riptide-cache::adapters::redis_session_storage`):
//! same `deadpool_redis` pool, `SET EX` with the session's remaining TTL, and
//! `KEYS`-pattern scan for listing. Adds the per-user index
//! (`user_sessions:{userId}`) spec.md §6 calls for, which the teacher's
//! single-tenant adapter didn't need.

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::SessionStore;
use fleet_types::session::{Session, SessionFilter};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::SessionStoreConfig;

pub struct RedisSessionStore {
    pool: Arc<Pool>,
    config: SessionStoreConfig,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str, config: SessionStoreConfig) -> Result<Self> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| FleetError::ExternalService(format!("failed to create redis pool: {e}")))?;
        Ok(Self { pool: Arc::new(pool), config })
    }

    pub fn from_pool(pool: Arc<Pool>, config: SessionStoreConfig) -> Self {
        Self { pool, config }
    }

    fn session_key(id: &str) -> String {
        format!("session:{id}")
    }

    fn user_index_key(user_id: &str) -> String {
        format!("user_sessions:{user_id}")
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis connection failed: {e}")))
    }

    fn serialize(session: &Session) -> Result<String> {
        serde_json::to_string(session).map_err(|e| FleetError::Validation(format!("session serialize failed: {e}")))
    }

    fn deserialize(data: &str) -> Result<Session> {
        serde_json::from_str(data).map_err(|e| FleetError::Validation(format!("session deserialize failed: {e}")))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip(self), fields(session_id = %session.id))]
    async fn create(&self, session: Session) -> Result<()> {
        self.update(session).await
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let mut conn = self.conn().await?;
        let key = Self::session_key(id);
        let data: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis GET failed: {e}")))?;

        match data {
            Some(json) => {
                let session = Self::deserialize(&json)?;
                let now = chrono::Utc::now();
                if session.is_expired(now) {
                    debug!("session expired past Redis TTL, deleting");
                    self.delete(id).await?;
                    return Ok(None);
                }
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn update(&self, session: Session) -> Result<()> {
        let now = chrono::Utc::now();
        let ttl = session.remaining_ttl(now);
        if ttl <= chrono::Duration::zero() {
            return Err(FleetError::Validation("cannot save an already-expired session".into()));
        }

        let mut conn = self.conn().await?;
        let key = Self::session_key(&session.id);
        let json = Self::serialize(&session)?;
        let secs = ttl.num_seconds().max(1) as u64;

        let _: () = conn
            .set_ex(&key, json, secs)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis SET EX failed: {e}")))?;

        let index_key = Self::user_index_key(&session.principal.user_id);
        let _: () = conn
            .sadd(&index_key, &session.id)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis SADD failed: {e}")))?;
        let index_ttl = secs + self.config.user_index_ttl_buffer.num_seconds().max(0) as u64;
        let _: () = conn
            .expire(&index_key, index_ttl as i64)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis EXPIRE failed: {e}")))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let key = Self::session_key(id);

        let existing: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis GET failed: {e}")))?;
        let Some(json) = existing else { return Ok(false) };
        let session = Self::deserialize(&json)?;

        let deleted: i64 = conn
            .del(&key)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis DEL failed: {e}")))?;
        let _: () = conn
            .srem(Self::user_index_key(&session.principal.user_id), id)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis SREM failed: {e}")))?;

        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn touch(&self, id: &str) -> Result<Option<Session>> {
        let Some(mut session) = self.get(id).await? else { return Ok(None) };
        session.touch(chrono::Utc::now());
        self.update(session.clone()).await?;
        Ok(Some(session))
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let mut conn = self.conn().await?;
        let now = chrono::Utc::now();

        let keys: Vec<String> = match &filter.user_id {
            Some(user_id) => {
                let ids: Vec<String> = conn
                    .smembers(Self::user_index_key(user_id))
                    .await
                    .map_err(|e| FleetError::ExternalService(format!("redis SMEMBERS failed: {e}")))?;
                ids.into_iter().map(|id| Self::session_key(&id)).collect()
            }
            None => deadpool_redis::redis::cmd("KEYS")
                .arg("session:*")
                .query_async(&mut conn)
                .await
                .map_err(|e| FleetError::ExternalService(format!("redis KEYS failed: {e}")))?,
        };

        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            let data: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| FleetError::ExternalService(format!("redis GET failed: {e}")))?;
            let Some(json) = data else { continue };
            match Self::deserialize(&json) {
                Ok(session) => {
                    if filter.active_only && session.is_expired(now) {
                        continue;
                    }
                    sessions.push(session);
                }
                Err(e) => warn!("failed to deserialize session at {key}: {e}"),
            }
        }
        Ok(sessions)
    }

    #[instrument(skip(self))]
    async fn count_for_user(&self, user_id: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let count: usize = conn
            .scard(Self::user_index_key(user_id))
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis SCARD failed: {e}")))?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn evict_expired(&self) -> Result<usize> {
        // Redis expires `session:{id}` keys itself; this sweeps any session
        // whose TTL landed on a key that outlived its logical expiry (clock
        // skew between the app and Redis) and prunes dangling user-index ids
        // left behind once the underlying `session:{id}` key has already gone.
        let all = self.list(&SessionFilter::default()).await?;
        let now = chrono::Utc::now();
        let mut count = 0;
        for session in all {
            if session.is_expired(now) {
                self.delete(&session.id).await?;
                count += 1;
            }
        }

        let mut conn = self.conn().await?;
        let index_keys: Vec<String> = deadpool_redis::redis::cmd("KEYS")
            .arg("user_sessions:*")
            .query_async(&mut conn)
            .await
            .map_err(|e| FleetError::ExternalService(format!("redis KEYS failed: {e}")))?;
        for index_key in index_keys {
            let ids: Vec<String> = conn
                .smembers(&index_key)
                .await
                .map_err(|e| FleetError::ExternalService(format!("redis SMEMBERS failed: {e}")))?;
            for id in ids {
                let exists: bool = conn
                    .exists(Self::session_key(&id))
                    .await
                    .map_err(|e| FleetError::ExternalService(format!("redis EXISTS failed: {e}")))?;
                if !exists {
                    let _: () = conn
                        .srem(&index_key, &id)
                        .await
                        .map_err(|e| FleetError::ExternalService(format!("redis SREM failed: {e}")))?;
                }
            }
        }

        Ok(count)
    }
}
