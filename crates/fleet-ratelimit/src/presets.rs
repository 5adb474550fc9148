//! Endpoint presets, per spec.md §4.10.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPreset {
    pub limit: u32,
    pub window: Duration,
    /// Whether successful requests also consume quota (auth endpoints count
    /// every attempt, successful or not).
    pub count_successes: bool,
}

pub const AUTH: RateLimitPreset = RateLimitPreset { limit: 5, window: Duration::from_secs(15 * 60), count_successes: true };
pub const API: RateLimitPreset = RateLimitPreset { limit: 100, window: Duration::from_secs(15 * 60), count_successes: true };
pub const STATIC_ASSETS: RateLimitPreset =
    RateLimitPreset { limit: 1000, window: Duration::from_secs(15 * 60), count_successes: true };

/// Cost-based limiting (spec.md §4.10): callers pass a per-operation cost in
/// place of the flat `1` a request would otherwise consume. The preset here
/// only fixes the budget and window; the per-operation cost table is left to
/// the caller, since spec.md names it as "configurable per operation" rather
/// than a fixed set this crate should own.
pub const COST_BASED_DEFAULT_BUDGET: RateLimitPreset =
    RateLimitPreset { limit: 1000, window: Duration::from_secs(15 * 60), count_successes: true };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_preset_matches_the_documented_budget() {
        assert_eq!(AUTH.limit, 5);
        assert_eq!(AUTH.window, Duration::from_secs(900));
    }
}
