//! # TDM: quota-based round scheduling
//!
//! Each path gets a burst allowance of R units per round. The scheduler keeps
//! feeding the path that is part-way through its allowance, starts an idle
//! path when none is, and resets every eligible path once all of them used up
//! their allowance:
//!
//! ```text
//!   Idle ──select──▶ Active ──select──▶ Active ── quota ≥ R ──▶ Full
//!     ▲                                                         │
//!     └────────── every eligible path Full: reset all ──────────┘
//! ```
//!
//! Selection runs in at most [`MAX_PASSES`] scans. The second scan only
//! happens after a reset, when every eligible path is Idle, so it always
//! selects.
//!
//! Quota is charged when a decision is returned, before the transmission
//! layer confirms the send.

use tracing::{debug, trace};

use super::eligibility::{check, is_available, Checks};
use super::reinject;
use super::{Decision, PathScheduler, Source};
use crate::config::SharedConfig;
use crate::model::{Connection, PathIndex, PathMask, Segment};
use crate::stats::SchedulerStats;

/// Upper bound on path scans per decision: the normal scan plus the rescan
/// after a round-exhaustion reset.
pub const MAX_PASSES: usize = 2;

/// Result of one scan over the connection's paths.
#[derive(Debug, Default)]
struct Scan {
    /// Position in `Connection::paths()` of the selected path.
    selected: Option<usize>,
    eligible: PathMask,
    full: u32,
}

fn scan_paths(conn: &Connection, segment: &Segment, round_size: u32, checks: Checks) -> Scan {
    let mut scan = Scan::default();
    let mut idle = None;

    for (pos, path) in conn.paths().iter().enumerate() {
        if !is_available(conn, path, Some(segment), checks) {
            continue;
        }
        scan.eligible.insert(path.index());

        let quota = path.quota();
        if quota > 0 && quota < round_size {
            // Finishing a burst in progress beats starting a new one.
            scan.selected = Some(pos);
            return scan;
        }
        if quota == 0 {
            idle = Some(pos);
        } else {
            scan.full += 1;
        }
    }

    scan.selected = idle;
    scan
}

/// Quota-based round scheduler for one connection.
pub struct TdmScheduler {
    config: SharedConfig,
    stats: SchedulerStats,
}

impl TdmScheduler {
    pub fn new(config: SharedConfig) -> Self {
        TdmScheduler {
            config,
            stats: SchedulerStats::default(),
        }
    }

    fn next_fallback(&mut self, conn: &Connection) -> Option<Decision> {
        let segment = conn.primary_head()?.clone();
        let path = conn.paths().first()?.index();
        self.stats.fallback += 1;
        Some(Decision {
            byte_limit: u64::from(segment.len()),
            segment,
            path,
            source: Source::Fallback,
        })
    }

    fn next_reinjected(&mut self, conn: &mut Connection) -> Option<Decision> {
        let choice = reinject::choose_path(conn, conn.reinject_head()?, false);
        let Some(choice) = choice else {
            self.stats.no_path += 1;
            return None;
        };

        let head = conn.reinject_head_mut()?;
        if choice.restart_carried {
            head.restart_carried();
            self.stats.carried_restarts += 1;
        }
        let segment = head.clone();
        self.stats.reinjected += 1;
        trace!(path = %choice.path, seq = segment.seq, "reinjecting unit");
        Some(Decision {
            byte_limit: u64::from(segment.len()),
            segment,
            path: choice.path,
            source: Source::Reinjected,
        })
    }

    fn next_primary(&mut self, conn: &mut Connection) -> Option<Decision> {
        let config = self.config.snapshot();
        let round_size = config.round_size;
        let policy = Checks::selection(&config);
        let segment = conn.primary_head()?.clone();

        let mut selected = None;
        for pass in 0..MAX_PASSES {
            let scan = scan_paths(conn, &segment, round_size, policy);
            if scan.selected.is_some() {
                selected = scan.selected;
                break;
            }
            let eligible = scan.eligible.len();
            if eligible == 0 || eligible != scan.full || pass + 1 == MAX_PASSES {
                break;
            }

            debug!(paths = eligible, round_size, "round exhausted, resetting quotas");
            self.stats.round_resets += 1;
            for path in conn.paths_mut() {
                if scan.eligible.contains(path.index()) {
                    path.sched.reset();
                }
            }
        }

        let Some(pos) = selected else {
            self.stats.no_path += 1;
            return None;
        };

        let path = &conn.paths()[pos];
        if let Err(reason) = check(conn, path, Some(&segment), Checks::FULL) {
            debug!(
                path = %path.index(),
                seq = segment.seq,
                reason = reason.as_str(),
                "selected path failed final check"
            );
            self.stats.recheck_aborts += 1;
            return None;
        }

        let mss = path.mss;
        let remaining = round_size.saturating_sub(path.quota());
        let byte_limit = u64::from(remaining) * u64::from(mss);
        let index = path.index();

        let path = &mut conn.paths_mut()[pos];
        path.sched.charge(segment.len(), mss);
        trace!(
            path = %index,
            seq = segment.seq,
            byte_limit,
            quota = path.quota(),
            "scheduled unit"
        );

        self.stats.primary += 1;
        Some(Decision {
            segment,
            path: index,
            byte_limit,
            source: Source::Primary,
        })
    }
}

impl PathScheduler for TdmScheduler {
    fn name(&self) -> &'static str {
        "tdm"
    }

    fn get_path(
        &mut self,
        conn: &Connection,
        segment: &mut Segment,
        zero_window_check: bool,
    ) -> Option<PathIndex> {
        let had_carried = !segment.carried().is_empty();
        let path = reinject::get_path(conn, segment, zero_window_check)?;
        if had_carried && segment.carried().is_empty() {
            self.stats.carried_restarts += 1;
        }
        Some(path)
    }

    fn next_segment(&mut self, conn: &mut Connection) -> Option<Decision> {
        if conn.fallback {
            return self.next_fallback(conn);
        }
        if conn.reinject_head().is_some() {
            return self.next_reinjected(conn);
        }
        self.next_primary(conn)
    }

    fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}
