//! Circuit breakers for named operations (`browser.acquire`, `page.navigate`, ...).
//!
//! Grounded on the teacher's `riptide-reliability` crate: a phase-based-locking
//! state machine plus a registry of named instances, using the presets and
//! config shapes from `fleet_types::circuit`.

pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{Admission, CircuitBreaker};
pub use registry::CircuitBreakerRegistry;
