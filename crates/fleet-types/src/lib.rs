//! Shared domain types and port traits for the browser fleet.
//!
//! Every other crate in the workspace depends on this one. It defines the
//! nouns (`Session`, `BrowserInstance`, `ApiKey`, `Action`...) and the seams
//! (`ports::*`) that adapters implement — nothing in here talks to a browser,
//! Redis, or the network directly.

pub mod acquisition;
pub mod action;
pub mod apikey;
pub mod browser;
pub mod circuit;
pub mod context;
pub mod error;
pub mod page;
pub mod ports;
pub mod session;

pub use acquisition::{AcquireRequest, AcquisitionFailure};
pub use action::{Action, ActionResult, ErrorClass};
pub use apikey::{ApiKey, IssuedApiKey};
pub use browser::{BrowserInstance, BrowserState};
pub use circuit::{CircuitConfig, CircuitSnapshot, CircuitState};
pub use context::{Context, ContextStatus};
pub use error::{ErrorContext, FleetError, Result};
pub use page::Page;
pub use session::{Principal, Session, SessionFilter, SessionPatch};
