//! # Scheduler statistics
//!
//! Counters kept by a scheduler across its connection's lifetime. A `None`
//! outcome is normal backpressure, so those are counted, not logged.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Decisions for primary-queue units.
    pub primary: u64,
    /// Decisions for reinjection-queue units.
    pub reinjected: u64,
    /// Decisions taken in single-path fallback mode.
    pub fallback: u64,
    /// Round-exhaustion resets.
    pub round_resets: u64,
    /// Calls that found data pending but no eligible path.
    pub no_path: u64,
    /// Selections dropped because the final full check failed.
    pub recheck_aborts: u64,
    /// Reinjected units whose carried-path set was cleared.
    pub carried_restarts: u64,
}

impl SchedulerStats {
    /// Total decisions handed to the transmission layer.
    pub fn decisions(&self) -> u64 {
        self.primary + self.reinjected + self.fallback
    }
}
