//! Root `AppContext`: wires the pool, executor, session store, auth, rate
//! limiter, metrics, and event bus into one object every protocol frontend
//! is handed. Grounded on spec.md §9's "global singletons become explicit
//! dependencies passed through a root context."

use crate::config::{FleetConfig, SessionStoreBackend};
use crate::resource_probe::SysinfoResourceProbe;
use fleet_auth::TokenService;
use fleet_events::EventBus;
use fleet_executor::{ActionExecutor, PageManager};
use fleet_metrics::MetricsRegistry;
use fleet_pool::BrowserPool;
use fleet_ratelimit::{InMemoryRateLimiter, RedisRateLimiter};
use fleet_reliability::CircuitBreakerRegistry;
use fleet_session::{InMemorySessionStore, RedisSessionStore, Sweeper};
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::{Clock, MetricsSink, RateLimiter, SessionStore, SystemClock};
use std::sync::Arc;

pub struct AppContext {
    pub clock: Arc<dyn Clock>,
    pub events: Arc<EventBus>,
    pub metrics: Arc<MetricsRegistry>,
    pub circuit_breakers: Arc<CircuitBreakerRegistry>,
    pub pool: Arc<BrowserPool>,
    pub executor: Arc<ActionExecutor>,
    pub pages: Arc<PageManager>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<TokenService>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    sweeper: Option<Sweeper>,
}

impl AppContext {
    pub async fn new(config: FleetConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let events = Arc::new(EventBus::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let circuit_breakers = Arc::new(CircuitBreakerRegistry::with_events(events.clone()));

        let metrics_sink: Arc<dyn MetricsSink> = metrics.clone();
        let driver = Arc::new(fleet_driver::SpiderChromeDriver::new());
        let resource_probe = Arc::new(SysinfoResourceProbe::new());
        let pool = Arc::new(
            BrowserPool::with_extras(config.pool.clone(), driver, clock.clone(), metrics_sink.clone(), Some(events.clone()), resource_probe)
                .await?,
        );

        let executor = Arc::new(ActionExecutor::new(config.executor.clone(), events.clone(), clock.clone(), metrics_sink.clone()));
        let pages = Arc::new(PageManager::new(pool.clone(), clock.clone()));

        let sessions: Arc<dyn SessionStore> = match config.session_store_backend {
            SessionStoreBackend::Memory => Arc::new(InMemorySessionStore::new(clock.clone())),
            SessionStoreBackend::Redis => {
                let url = config
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| FleetError::Configuration("REDIS_URL is required for the redis session store".into()))?;
                Arc::new(RedisSessionStore::new(url, config.session_store.clone())?)
            }
        };
        let sweeper = Some(Sweeper::spawn(sessions.clone(), config.session_store.sweep_interval));

        let tokens = Arc::new(TokenService::new(config.token.clone(), clock.clone()));

        // No separate rate-limiter backend toggle exists; it follows the same
        // memory/redis choice as the session store since both need the same
        // Redis connection to be worth running remotely.
        let rate_limiter: Arc<dyn RateLimiter> = match config.session_store_backend {
            SessionStoreBackend::Memory => Arc::new(InMemoryRateLimiter::new(clock.clone())),
            SessionStoreBackend::Redis => {
                let url = config
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| FleetError::Configuration("REDIS_URL is required for the redis rate limiter".into()))?;
                Arc::new(RedisRateLimiter::new(url)?)
            }
        };

        Ok(Self { clock, events, metrics, circuit_breakers, pool, executor, pages, sessions, tokens, rate_limiter, sweeper })
    }

    /// Stops background tasks owned by the context (sweeper, pool maintenance
    /// is stopped by dropping `pool`). Called during graceful shutdown.
    pub fn stop_background_tasks(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
    }
}
