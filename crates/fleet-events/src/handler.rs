use crate::event::DomainEvent;
use async_trait::async_trait;
use fleet_types::error::Result;

/// Grounded on the teacher's `EventHandler` trait (`riptide-events::bus`). Handlers
/// must be idempotent; the bus may redeliver on handler timeout in future revisions.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<()>;

    fn name(&self) -> &str;

    /// Whether this handler wants `event_type`. Default: everything.
    fn can_handle(&self, _event_type: &str) -> bool {
        true
    }
}

/// Logs every event at a level matching its severity. Grounded on the teacher's
/// `LoggingEventHandler`.
pub struct LoggingEventHandler {
    name: String,
}

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self {
            name: "logging_handler".to_string(),
        }
    }
}

impl Default for LoggingEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        use crate::event::EventSeverity::*;
        match event.severity {
            Debug => tracing::debug!(event_type = %event.event_type, aggregate_id = %event.aggregate_id, "event"),
            Info => tracing::info!(event_type = %event.event_type, aggregate_id = %event.aggregate_id, "event"),
            Warn => tracing::warn!(event_type = %event.event_type, aggregate_id = %event.aggregate_id, "event"),
            Error | Critical => tracing::error!(event_type = %event.event_type, aggregate_id = %event.aggregate_id, "event"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
