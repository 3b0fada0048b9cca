//! Aggregated health reporting.
//!
//! The overall daemon status is the worst status among enabled modules.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use std::time::Duration;

use serde::Serialize;
use tailpost_core::pipeline::HealthStatus;

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Worst status of all modules.
    pub status: HealthStatus,
    /// Seconds since the daemon was built.
    pub uptime_secs: u64,
    /// Per-module reports.
    pub modules: Vec<ModuleHealth>,
}

/// Health status for a single module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleHealth {
    /// Module name (e.g., "watcher", "emitter").
    pub name: String,
    /// Whether the module is enabled in configuration.
    pub enabled: bool,
    /// Current health status of the module.
    pub status: HealthStatus,
}

/// Aggregate module statuses into a single status.
///
/// Only enabled modules are considered. Reasons of the worst level are
/// joined with `"; "` and prefixed with the module name.
pub fn aggregate_status(modules: &[ModuleHealth]) -> HealthStatus {
    let mut degraded = Vec::new();
    let mut unhealthy = Vec::new();

    for module in modules.iter().filter(|m| m.enabled) {
        match &module.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => degraded.push(format!("{}: {}", module.name, reason)),
            HealthStatus::Unhealthy(reason) => {
                unhealthy.push(format!("{}: {}", module.name, reason))
            }
        }
    }

    if !unhealthy.is_empty() {
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}

impl DaemonHealth {
    /// Build a report from module statuses.
    pub fn from_modules(modules: Vec<ModuleHealth>, uptime: Duration) -> Self {
        Self {
            status: aggregate_status(&modules),
            uptime_secs: uptime.as_secs(),
            modules,
        }
    }
}
