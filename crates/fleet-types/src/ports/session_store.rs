//! Grounded on the teacher's `riptide-types::ports::session::SessionStorage` trait
//! and its in-memory/Redis adapter split.

use crate::error::FleetError;
use crate::session::{Session, SessionFilter};
use async_trait::async_trait;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<(), FleetError>;

    async fn get(&self, id: &str) -> Result<Option<Session>, FleetError>;

    async fn update(&self, session: Session) -> Result<(), FleetError>;

    async fn delete(&self, id: &str) -> Result<bool, FleetError>;

    async fn touch(&self, id: &str) -> Result<Option<Session>, FleetError>;

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>, FleetError>;

    async fn count_for_user(&self, user_id: &str) -> Result<usize, FleetError>;

    /// Removes every session whose `expires_at` has passed. Returns the count removed.
    async fn evict_expired(&self) -> Result<usize, FleetError>;
}
