//! Append-only audit sink for security-relevant events (spec: `AUDIT_LOG_ENABLED`,
//! `AUDIT_LOG_PATH`). Grounded on the teacher's `LoggingEventHandler` shape, swapped
//! to write newline-delimited JSON to a file instead of `tracing`.

use crate::event::DomainEvent;
use crate::handler::EventHandler;
use async_trait::async_trait;
use fleet_types::error::{FleetError, Result};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct AuditFileHandler {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl AuditFileHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    async fn ensure_open(&self) -> Result<()> {
        let mut guard = self.file.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| FleetError::System(format!("opening audit log {:?}: {e}", self.path)))?;
        *guard = Some(file);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for AuditFileHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        self.ensure_open().await?;
        let line = serde_json::to_string(event)?;
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().expect("ensure_open populates the slot");
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| FleetError::System(format!("writing audit log: {e}")))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| FleetError::System(format!("writing audit log: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "audit_file_handler"
    }

    fn can_handle(&self, event_type: &str) -> bool {
        event_type.starts_with("security.") || event_type.starts_with("auth.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{names, EventSeverity};

    #[tokio::test]
    async fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let handler = AuditFileHandler::new(&path);
        let event = DomainEvent::new(
            names::SECURITY_AUTH_FAILURE,
            "user-1",
            EventSeverity::Warn,
            serde_json::json!({"reason": "bad_password"}),
            chrono::Utc::now(),
        );
        handler.handle(&event).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains(names::SECURITY_AUTH_FAILURE));
    }

    #[test]
    fn only_handles_security_and_auth_events() {
        let handler = AuditFileHandler::new("/dev/null");
        assert!(handler.can_handle(names::SECURITY_ANOMALY));
        assert!(handler.can_handle(names::AUTH_TOKEN_REFRESHED));
        assert!(!handler.can_handle(names::POOL_BROWSER_LAUNCHED));
    }
}
