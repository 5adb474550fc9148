//! Root wiring: `FleetConfig` (environment-driven, §6) and `AppContext` (the
//! root dependency graph every protocol frontend is handed, §9).

pub mod app_context;
pub mod config;
pub mod resource_probe;

pub use app_context::AppContext;
pub use config::{FleetConfig, SessionStoreBackend};
pub use resource_probe::SysinfoResourceProbe;
