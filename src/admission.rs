//! Memory-pressure admission gate.
//!
//! Processing decodes whole images into memory, so new work is refused when
//! the machine is already close to full. The check is a single snapshot taken
//! right before a request starts; nothing is queued.

use std::sync::Mutex;
use sysinfo::System;
use tracing::debug;

/// Memory usage snapshot in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
}

impl MemoryUsage {
    /// Used fraction in 0.0–1.0. Zero when the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64
        }
    }
}

pub trait AdmissionGate: Send + Sync {
    /// Current memory usage.
    fn usage(&self) -> MemoryUsage;

    /// Used fraction at or above which requests are refused.
    fn threshold(&self) -> f64;

    fn under_pressure(&self) -> bool {
        self.usage().fraction() >= self.threshold()
    }
}

/// Gate backed by the operating system's memory counters.
pub struct MemoryGate {
    system: Mutex<System>,
    threshold: f64,
}

impl MemoryGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            system: Mutex::new(System::new()),
            threshold,
        }
    }
}

impl AdmissionGate for MemoryGate {
    fn usage(&self) -> MemoryUsage {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_memory();
        let total = system.total_memory();
        let used = total.saturating_sub(system.available_memory());
        debug!(total, used, "memory check");
        MemoryUsage { total, used }
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}
