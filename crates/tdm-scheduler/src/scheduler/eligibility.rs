//! Path eligibility predicate.
//!
//! Decides whether a path may carry a given segment right now. The checks run
//! in a fixed order and stop at the first failure:
//!
//! ```text
//! sendable state → confirmed → not probing → loss recovery → in-order
//!   → congestion window (optional) → receive window (optional)
//! ```
//!
//! Nothing here mutates state. A path whose index does not match the
//! connection's expected rotation ordinal only produces a debug event.

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::model::segment::seq_before;
use crate::model::{AckMode, Connection, Path, PathState, Segment};

/// Which optional window checks to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checks {
    /// Reject when the write cursor reached the receiver window edge.
    pub zero_window: bool,
    /// Reject when the congestion window is already filled.
    pub cwnd: bool,
}

impl Checks {
    /// Both window checks on.
    pub const FULL: Checks = Checks {
        zero_window: true,
        cwnd: true,
    };

    pub const fn new(zero_window: bool, cwnd: bool) -> Self {
        Checks { zero_window, cwnd }
    }

    /// Checks applied while scanning for a quota path: receive window off,
    /// congestion window per `cwnd_limited`.
    pub const fn selection(config: &SchedulerConfig) -> Self {
        Checks::new(false, config.cwnd_limited)
    }
}

/// Why a path was found ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotSendable,
    PreEstablished,
    PossiblyFailed,
    LossRecovery,
    OutOfOrder,
    CwndFull,
    CwndQueued,
    ZeroWindow,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NotSendable => "not_sendable",
            Rejection::PreEstablished => "pre_established",
            Rejection::PossiblyFailed => "possibly_failed",
            Rejection::LossRecovery => "loss_recovery",
            Rejection::OutOfOrder => "out_of_order",
            Rejection::CwndFull => "cwnd_full",
            Rejection::CwndQueued => "cwnd_queued",
            Rejection::ZeroWindow => "zero_window",
        }
    }
}

/// Runs every check and reports the first one that failed.
pub fn check(
    conn: &Connection,
    path: &Path,
    segment: Option<&Segment>,
    checks: Checks,
) -> Result<(), Rejection> {
    if let Some(expected) = conn.expected_ordinal {
        if path.index().ordinal() != expected {
            debug!(
                path = %path.index(),
                expected_ordinal = expected,
                "path does not match expected rotation ordinal"
            );
        }
    }

    if !path.state.can_send() {
        return Err(Rejection::NotSendable);
    }
    if path.state == PathState::PreEstablished {
        return Err(Rejection::PreEstablished);
    }
    if path.state == PathState::PossiblyFailed {
        return Err(Rejection::PossiblyFailed);
    }

    // Without selective acks the path only leaves recovery once everything
    // up to high_seq is acknowledged; nothing new may be pushed before that.
    if path.state == PathState::LossRecovery
        && (path.ack_mode != AckMode::Cumulative || path.snd_una != path.high_seq)
    {
        return Err(Rejection::LossRecovery);
    }

    if path.state == PathState::FullyEstablishing {
        if let Some(seg) = segment {
            if path.second_unit && path.last_end_seq != seg.seq {
                return Err(Rejection::OutOfOrder);
            }
        }
    }

    if checks.cwnd {
        if path.in_flight >= path.cwnd {
            return Err(Rejection::CwndFull);
        }
        if u64::from(path.queued_bytes()) > path.cwnd_space() {
            return Err(Rejection::CwndQueued);
        }
    }

    if checks.zero_window && !seq_before(path.write_seq, path.wnd_end) {
        return Err(Rejection::ZeroWindow);
    }

    Ok(())
}

/// Whether `path` may carry `segment` right now.
pub fn is_available(
    conn: &Connection,
    path: &Path,
    segment: Option<&Segment>,
    checks: Checks,
) -> bool {
    check(conn, path, segment, checks).is_ok()
}
