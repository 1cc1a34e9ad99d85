//! Path scheduling for multipath connections.
//!
//! A scheduler answers two questions for the transmission layer:
//! - which queued segment goes next, on which path, and how many bytes that
//!   path may take right now ([`PathScheduler::next_segment`])
//! - which path should carry one particular segment
//!   ([`PathScheduler::get_path`]), e.g. a close-signal reply
//!
//! The policy is picked per connection from [`SchedulerKind`]; the only
//! policy shipped is quota-based round scheduling ([`tdm::TdmScheduler`]).

pub mod eligibility;
pub mod reinject;
pub mod tdm;

use serde::Serialize;

use crate::config::{SchedulerKind, SharedConfig};
use crate::model::{Connection, PathIndex, Segment};
use crate::stats::SchedulerStats;

/// Queue a decided segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Primary,
    Reinjected,
    /// Primary queue in single-path fallback mode.
    Fallback,
}

/// A scheduling decision. The segment is still queued; the transmission
/// layer dequeues it from `source` once it accepts the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub segment: Segment,
    pub path: PathIndex,
    /// Bytes the path may carry in this burst.
    pub byte_limit: u64,
    pub source: Source,
}

/// Capability interface of a scheduling policy.
///
/// Both calls return `None` as a normal outcome: nothing pending, or nothing
/// sendable yet. Callers retry on the next ack, window update, path change
/// or timer; never in a loop.
pub trait PathScheduler: Send {
    fn name(&self) -> &'static str;

    /// Path that should carry `segment`, checking the receive window only if
    /// `zero_window_check` is set. May clear the segment's carried set.
    fn get_path(
        &mut self,
        conn: &Connection,
        segment: &mut Segment,
        zero_window_check: bool,
    ) -> Option<PathIndex>;

    fn next_segment(&mut self, conn: &mut Connection) -> Option<Decision>;

    fn stats(&self) -> &SchedulerStats;
}

/// Builds the policy selected by the current configuration.
pub fn build_scheduler(config: &SharedConfig) -> Box<dyn PathScheduler> {
    match config.snapshot().kind {
        SchedulerKind::Tdm => Box::new(tdm::TdmScheduler::new(config.clone())),
    }
}
