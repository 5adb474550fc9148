//! Real `ResourceProbe` backing `fleet-pool`'s recycling engine. `fleet-pool`
//! only defines the trait and a `NoopResourceProbe` for tests; wiring a real
//! sampler here keeps `fleet-pool` free of a `sysinfo` dependency it has no
//! other use for.

use fleet_pool::{ResourceProbe, ResourceSample};
use parking_lot::Mutex;
use std::collections::HashMap;
use sysinfo::{Pid, System};

/// Maps browser instance ids to OS process ids so samples can be attributed
/// per instance; the pool registers a pid when it launches an instance and
/// deregisters it on dispose.
pub struct SysinfoResourceProbe {
    system: Mutex<System>,
    pids: Mutex<HashMap<String, u32>>,
}

impl SysinfoResourceProbe {
    pub fn new() -> Self {
        Self { system: Mutex::new(System::new_all()), pids: Mutex::new(HashMap::new()) }
    }

    pub fn register(&self, browser_id: &str, pid: u32) {
        self.pids.lock().insert(browser_id.to_string(), pid);
    }

    pub fn deregister(&self, browser_id: &str) {
        self.pids.lock().remove(browser_id);
    }
}

impl Default for SysinfoResourceProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoResourceProbe {
    fn sample(&self, browser_id: &str) -> ResourceSample {
        let Some(&pid) = self.pids.lock().get(browser_id) else {
            return ResourceSample::default();
        };

        let mut system = self.system.lock();
        let pid = Pid::from_u32(pid);
        system.refresh_process(pid);
        match system.process(pid) {
            Some(process) => ResourceSample {
                memory_mb: process.memory() / (1024 * 1024),
                cpu_percent: process.cpu_usage() as f64,
            },
            None => ResourceSample::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_an_unregistered_instance_returns_zero() {
        let probe = SysinfoResourceProbe::new();
        let sample = probe.sample("unknown");
        assert_eq!(sample.memory_mb, 0);
    }
}
