//! Root configuration, assembled from environment variables per spec.md §6.
//! Grounded on `fleet-pool`/`fleet-executor`'s own config structs: plain
//! fields with a `Default` impl, no builder.

use fleet_auth::TokenConfig;
use fleet_executor::ExecutorConfig;
use fleet_pool::PoolConfig;
use fleet_session::{ReplicationConfig, SessionStoreConfig};
use fleet_types::error::{FleetError, Result};
use jsonwebtoken::Algorithm;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStoreBackend {
    Memory,
    Redis,
}

#[derive(Clone, Debug)]
pub struct FleetConfig {
    pub pool: PoolConfig,
    pub executor: ExecutorConfig,
    pub session_store: SessionStoreConfig,
    pub replication: ReplicationConfig,
    pub token: TokenConfig,
    pub session_store_backend: SessionStoreBackend,
    pub redis_url: Option<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub audit_log_enabled: bool,
    pub audit_log_path: Option<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            executor: ExecutorConfig::default(),
            session_store: SessionStoreConfig::default(),
            replication: ReplicationConfig::default(),
            token: TokenConfig::default(),
            session_store_backend: SessionStoreBackend::Memory,
            redis_url: None,
            rate_limit_window: Duration::from_secs(15 * 60),
            rate_limit_max_requests: 100,
            audit_log_enabled: false,
            audit_log_path: None,
        }
    }
}

impl FleetConfig {
    /// Reads `JWT_SECRET`, `JWT_EXPIRES_IN`, `JWT_REFRESH_EXPIRES_IN`,
    /// `JWT_ALGORITHM`, `SESSION_STORE_TYPE`, `REDIS_URL`, `RATE_LIMIT_WINDOW`,
    /// `RATE_LIMIT_MAX_REQUESTS`, `AUDIT_LOG_ENABLED`, `AUDIT_LOG_PATH` per
    /// spec.md §6's configuration table. Unset variables fall back to the
    /// same defaults as `FleetConfig::default()`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.token.secret = secret;
        } else {
            return Err(FleetError::Configuration("JWT_SECRET is required".into()));
        }

        if let Some(secs) = env_secs("JWT_EXPIRES_IN")? {
            config.token.access_ttl = chrono::Duration::seconds(secs);
        }
        if let Some(secs) = env_secs("JWT_REFRESH_EXPIRES_IN")? {
            config.token.refresh_ttl = chrono::Duration::seconds(secs);
        }
        if let Ok(alg) = std::env::var("JWT_ALGORITHM") {
            config.token.algorithm = parse_algorithm(&alg)?;
        }

        if let Ok(kind) = std::env::var("SESSION_STORE_TYPE") {
            config.session_store_backend = match kind.as_str() {
                "memory" => SessionStoreBackend::Memory,
                "redis" | "auto" => SessionStoreBackend::Redis,
                other => return Err(FleetError::Configuration(format!("unknown SESSION_STORE_TYPE: {other}"))),
            };
        }
        config.redis_url = std::env::var("REDIS_URL").ok();
        if config.session_store_backend == SessionStoreBackend::Redis && config.redis_url.is_none() {
            return Err(FleetError::Configuration("REDIS_URL is required when SESSION_STORE_TYPE=redis".into()));
        }

        if let Some(secs) = env_secs("RATE_LIMIT_WINDOW")? {
            config.rate_limit_window = Duration::from_secs(secs.max(0) as u64);
        }
        if let Ok(max) = std::env::var("RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limit_max_requests =
                max.parse().map_err(|_| FleetError::Configuration("RATE_LIMIT_MAX_REQUESTS must be an integer".into()))?;
        }

        config.audit_log_enabled = std::env::var("AUDIT_LOG_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(false);
        config.audit_log_path = std::env::var("AUDIT_LOG_PATH").ok();

        Ok(config)
    }
}

fn env_secs(name: &str) -> Result<Option<i64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| FleetError::Configuration(format!("{name} must be an integer number of seconds"))),
        Err(_) => Ok(None),
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(FleetError::Configuration(format!("unsupported JWT_ALGORITHM: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_session_store() {
        let config = FleetConfig::default();
        assert_eq!(config.session_store_backend, SessionStoreBackend::Memory);
    }
}
