//! The in-memory event bus. Grounded on the teacher's `riptide-events::bus::EventBus`:
//! a `tokio::sync::broadcast` channel fans events out to subscribers, plus a
//! registered-handler map processed by a background task. Simplified relative to
//! the teacher by dropping pattern/severity routing tables (`EventRouting`) in
//! favor of each handler filtering via `can_handle`.

use crate::event::DomainEvent;
use crate::handler::EventHandler;
use fleet_types::error::{FleetError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub buffer_size: usize,
    pub handler_timeout: Duration,
    pub continue_on_handler_error: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            handler_timeout: Duration::from_secs(5),
            continue_on_handler_error: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBusStats {
    pub buffer_size: usize,
    pub current_subscribers: usize,
    pub is_running: bool,
}

pub struct EventSubscription {
    receiver: broadcast::Receiver<Arc<DomainEvent>>,
    pattern: String,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Option<Arc<DomainEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.matches(&self.pattern) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event subscription lagged, dropping events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub struct EventBus {
    config: EventBusConfig,
    handlers: Arc<RwLock<HashMap<String, Arc<dyn EventHandler>>>>,
    sender: broadcast::Sender<Arc<DomainEvent>>,
    _receiver: broadcast::Receiver<Arc<DomainEvent>>,
    running: Arc<AtomicBool>,
    handler_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, receiver) = broadcast::channel(config.buffer_size);
        Self {
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            sender,
            _receiver: receiver,
            running: Arc::new(AtomicBool::new(false)),
            handler_task: None,
            shutdown_tx: None,
        }
    }

    pub async fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut receiver = self.sender.subscribe();
        let handlers = self.handlers.clone();
        let config = self.config.clone();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let handler_task = tokio::spawn(async move {
            tracing::info!("event bus started");
            loop {
                tokio::select! {
                    result = receiver.recv() => {
                        match result {
                            Ok(event) => Self::dispatch(&handlers, event, &config).await,
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(lagged = n, "event bus handler loop lagged");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::info!("event bus stopped");
        });

        self.handler_task = Some(handler_task);
    }

    async fn dispatch(
        handlers: &Arc<RwLock<HashMap<String, Arc<dyn EventHandler>>>>,
        event: Arc<DomainEvent>,
        config: &EventBusConfig,
    ) {
        let handlers_map = handlers.read().await;
        let targets: Vec<_> = handlers_map
            .iter()
            .filter(|(_, h)| h.can_handle(&event.event_type))
            .map(|(name, h)| (name.clone(), h.clone()))
            .collect();
        drop(handlers_map);

        for (name, handler) in targets {
            let event = event.clone();
            match tokio::time::timeout(config.handler_timeout, handler.handle(&event)).await {
                Ok(Ok(())) => {
                    tracing::debug!(handler = %name, event_id = %event.id, "handler processed event")
                }
                Ok(Err(e)) => {
                    tracing::error!(handler = %name, event_id = %event.id, error = %e, "handler failed");
                    if !config.continue_on_handler_error {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(handler = %name, event_id = %event.id, "handler timed out");
                }
            }
        }
    }

    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(task) = self.handler_task.take() {
            let _ = task.await;
        }
    }

    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        let name = handler.name().to_string();
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(&name) {
            return Err(FleetError::Validation(format!(
                "handler '{name}' is already registered"
            )));
        }
        handlers.insert(name, handler);
        Ok(())
    }

    pub async fn unregister_handler(&self, name: &str) -> Result<()> {
        let mut handlers = self.handlers.write().await;
        if handlers.remove(name).is_some() {
            Ok(())
        } else {
            Err(FleetError::NotFound(format!("handler '{name}' not registered")))
        }
    }

    pub fn subscribe(&self, pattern: impl Into<String>) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            pattern: pattern.into(),
        }
    }

    pub fn emit(&self, event: DomainEvent) {
        let event = Arc::new(event);
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(event_type = %event.event_type, "emitted with no subscribers");
        }
    }

    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            buffer_size: self.config.buffer_size,
            current_subscribers: self.sender.receiver_count().saturating_sub(1),
            is_running: self.running.load(Ordering::SeqCst),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{names, EventSeverity};
    use crate::handler::LoggingEventHandler;

    #[tokio::test]
    async fn emit_without_subscribers_does_not_error() {
        let bus = EventBus::new();
        bus.emit(DomainEvent::new(
            names::POOL_BROWSER_LAUNCHED,
            "browser-1",
            EventSeverity::Info,
            serde_json::json!({}),
            chrono::Utc::now(),
        ));
    }

    #[tokio::test]
    async fn subscription_filters_by_pattern() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("pool.*");
        bus.emit(DomainEvent::new(
            names::AUTH_TOKEN_REFRESHED,
            "s1",
            EventSeverity::Info,
            serde_json::json!({}),
            chrono::Utc::now(),
        ));
        bus.emit(DomainEvent::new(
            names::POOL_BROWSER_CHECKED_OUT,
            "b1",
            EventSeverity::Info,
            serde_json::json!({}),
            chrono::Utc::now(),
        ));
        let received = sub.recv().await.expect("one matching event");
        assert_eq!(received.event_type, names::POOL_BROWSER_CHECKED_OUT);
    }

    #[tokio::test]
    async fn handler_registration_rejects_duplicates() {
        let bus = EventBus::new();
        let handler = Arc::new(LoggingEventHandler::new());
        assert!(bus.register_handler(handler.clone()).await.is_ok());
        assert!(bus.register_handler(handler).await.is_err());
    }

    #[tokio::test]
    async fn start_and_stop_round_trip() {
        let mut bus = EventBus::new();
        bus.start().await;
        assert!(bus.stats().is_running);
        bus.stop().await;
        assert!(!bus.stats().is_running);
    }
}
