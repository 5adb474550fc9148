//! Four-axis recycling score. Grounded on the teacher's `full_health_check`
//! soft/hard-limit split (`riptide-headless::pool::PooledBrowser`), generalized
//! into a weighted multi-axis scorer per spec.md §4.3.

use crate::config::RecyclingConfig;
use chrono::{DateTime, Utc};
use fleet_types::browser::BrowserInstance;
use std::collections::HashSet;

/// A point-in-time resource reading for one browser instance. The pool samples
/// this out-of-band (e.g. via `sysinfo`) and feeds it into the scorer; recycling
/// itself has no opinion on how the sample was taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSample {
    pub memory_mb: u64,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticalReason {
    MaxLifetime,
    MaxUsage,
    HealthDegradation,
    MemoryPressure,
    CpuPressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone)]
pub struct RecyclingScore {
    pub time_score: f64,
    pub usage_score: f64,
    pub health_score: f64,
    pub resource_score: f64,
    pub hybrid_score: f64,
    pub critical_reasons: HashSet<CriticalReason>,
    pub lifecycle: LifecycleState,
}

impl RecyclingScore {
    pub fn should_recycle_now(&self) -> bool {
        self.lifecycle == LifecycleState::Critical
    }

    pub fn should_recycle_on_release(&self) -> bool {
        matches!(self.lifecycle, LifecycleState::Critical | LifecycleState::Degraded)
    }
}

/// Supplies resource readings for the resource-based axis. The pool is agnostic
/// to how samples are taken; a `sysinfo`-backed prober lives in `fleet-core`'s
/// wiring, and tests use `NoopResourceProbe`.
pub trait ResourceProbe: Send + Sync {
    fn sample(&self, browser_id: &str) -> ResourceSample;
}

pub struct NoopResourceProbe;

impl ResourceProbe for NoopResourceProbe {
    fn sample(&self, _browser_id: &str) -> ResourceSample {
        ResourceSample::default()
    }
}

/// Equal weighting across the four axes; spec.md leaves the inter-axis weights
/// as an open question, resolved here (see DESIGN.md) by giving each axis 0.25
/// since no axis is named as more authoritative than another.
const AXIS_WEIGHT: f64 = 0.25;

pub struct RecyclingEngine {
    config: RecyclingConfig,
}

impl RecyclingEngine {
    pub fn new(config: RecyclingConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        instance: &BrowserInstance,
        resource: ResourceSample,
        now: DateTime<Utc>,
    ) -> RecyclingScore {
        let mut critical = HashSet::new();

        let age_ms = instance.age(now).num_milliseconds().max(0) as f64;
        let max_lifetime_ms = self.config.max_lifetime.num_milliseconds().max(1) as f64;
        let idle_ms = instance.idle_for(now).num_milliseconds().max(0) as f64;
        let max_idle_ms = self.config.max_idle_time.num_milliseconds().max(1) as f64;
        let time_score = clamp_pct(age_ms / max_lifetime_ms) * 0.6 + clamp_pct(idle_ms / max_idle_ms) * 0.4;
        if age_ms > max_lifetime_ms {
            critical.insert(CriticalReason::MaxLifetime);
        }

        let use_ratio = instance.use_count as f64 / self.config.max_use_count.max(1) as f64;
        let page_ratio = instance.page_count as f64 / self.config.max_page_count.max(1) as f64;
        let usage_score = clamp_pct(use_ratio) * 0.6 + clamp_pct(page_ratio) * 0.4;
        if instance.use_count >= self.config.max_use_count {
            critical.insert(CriticalReason::MaxUsage);
        }

        let error_rate_penalty = (instance.error_count as f64 * 5.0).min(20.0);
        let health_score = ((100.0 - instance.health_score as f64) * 0.8 + error_rate_penalty).min(100.0);
        if instance.health_score < self.config.health_threshold {
            critical.insert(CriticalReason::HealthDegradation);
        }

        let memory_ratio = resource.memory_mb as f64 / self.config.memory_limit_mb.max(1) as f64;
        let cpu_ratio = resource.cpu_percent / self.config.cpu_limit_percent.max(0.01);
        let resource_score = clamp_pct(memory_ratio) * 0.6 + clamp_pct(cpu_ratio) * 0.4;
        if resource.memory_mb > self.config.memory_limit_mb {
            critical.insert(CriticalReason::MemoryPressure);
        }
        if resource.cpu_percent > self.config.cpu_limit_percent {
            critical.insert(CriticalReason::CpuPressure);
        }

        let hybrid_score =
            time_score * AXIS_WEIGHT + usage_score * AXIS_WEIGHT + health_score * AXIS_WEIGHT + resource_score * AXIS_WEIGHT;

        let lifecycle = if hybrid_score >= 95.0 || !critical.is_empty() {
            LifecycleState::Critical
        } else if hybrid_score >= 80.0 {
            LifecycleState::Degraded
        } else {
            LifecycleState::Healthy
        };

        RecyclingScore {
            time_score,
            usage_score,
            health_score,
            resource_score,
            hybrid_score,
            critical_reasons: critical,
            lifecycle,
        }
    }
}

fn clamp_pct(ratio: f64) -> f64 {
    ratio.clamp(0.0, 1.0) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::browser::BrowserInstance;

    fn engine() -> RecyclingEngine {
        RecyclingEngine::new(RecyclingConfig::default())
    }

    #[test]
    fn fresh_instance_scores_healthy() {
        let now = Utc::now();
        let instance = BrowserInstance::new(now);
        let score = engine().score(&instance, ResourceSample::default(), now);
        assert_eq!(score.lifecycle, LifecycleState::Healthy);
        assert!(score.critical_reasons.is_empty());
    }

    #[test]
    fn exceeding_max_lifetime_is_critical() {
        let now = Utc::now();
        let created = now - chrono::Duration::minutes(31);
        let instance = BrowserInstance::new(created);
        let score = engine().score(&instance, ResourceSample::default(), now);
        assert_eq!(score.lifecycle, LifecycleState::Critical);
        assert!(score.critical_reasons.contains(&CriticalReason::MaxLifetime));
    }

    #[test]
    fn memory_pressure_over_limit_is_critical() {
        let now = Utc::now();
        let instance = BrowserInstance::new(now);
        let sample = ResourceSample { memory_mb: 600, cpu_percent: 10.0 };
        let score = engine().score(&instance, sample, now);
        assert!(score.critical_reasons.contains(&CriticalReason::MemoryPressure));
    }

    #[test]
    fn degraded_does_not_require_immediate_recycle() {
        let now = Utc::now();
        let mut instance = BrowserInstance::new(now - chrono::Duration::minutes(20));
        instance.use_count = 350; // 70% of cap -> usage_score 42, time_score high but not critical
        let score = engine().score(&instance, ResourceSample::default(), now);
        if score.lifecycle == LifecycleState::Degraded {
            assert!(score.should_recycle_on_release());
            assert!(!score.should_recycle_now());
        }
    }
}
