//! Domain event bus shared by the pool, reliability, session, and auth crates.
//!
//! Grounded on the teacher's `riptide-events` crate: a broadcast-channel bus plus
//! a registered-handler map, simplified to one concrete `DomainEvent` type instead
//! of a `dyn Event` trait object, since every producer in this workspace already
//! shares `fleet-types`.

pub mod audit;
pub mod bus;
pub mod event;
pub mod handler;

pub use audit::AuditFileHandler;
pub use bus::{EventBus, EventBusConfig, EventBusStats, EventSubscription};
pub use event::{names, DomainEvent, EventSeverity};
pub use handler::{EventHandler, LoggingEventHandler};
