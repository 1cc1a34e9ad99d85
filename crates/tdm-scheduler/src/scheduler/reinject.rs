//! Path choice for reinjected units and for the close-signal reply.
//!
//! Quota accounting does not apply here. The selector avoids sending a unit
//! twice on the same path while another eligible path has not carried it yet.

use tracing::debug;

use super::eligibility::{is_available, Checks};
use crate::model::{Connection, PathIndex, Segment};

/// Outcome of [`choose_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub path: PathIndex,
    /// Every eligible path already carried the unit; its carried set must be
    /// cleared before it goes out again.
    pub restart_carried: bool,
}

/// Picks a path for `segment` without touching any state.
///
/// The congestion-window check is always applied.
pub fn choose_path(
    conn: &Connection,
    segment: &Segment,
    zero_window_check: bool,
) -> Option<Choice> {
    let checks = Checks::new(zero_window_check, true);

    // The close-signal reply must leave on the path that delivered the
    // peer's close; never on another one.
    if segment.close_signal {
        if let Some(close_path) = conn.close_path {
            return conn
                .path(close_path)
                .filter(|path| is_available(conn, path, Some(segment), checks))
                .map(|path| Choice {
                    path: path.index(),
                    restart_carried: false,
                });
        }
    }

    let carried = segment.carried();
    let mut fresh = None;
    let mut reused = None;
    for path in conn.paths() {
        if !is_available(conn, path, Some(segment), checks) {
            continue;
        }
        if carried.contains(path.index()) {
            reused = Some(path.index());
        } else {
            fresh = Some(path.index());
        }
    }

    match (fresh, reused) {
        (Some(path), _) => Some(Choice {
            path,
            restart_carried: false,
        }),
        (None, Some(path)) => {
            debug!(%path, seq = segment.seq, "all eligible paths carried unit, restarting");
            Some(Choice {
                path,
                restart_carried: true,
            })
        }
        (None, None) => None,
    }
}

/// [`choose_path`], then clears the carried set when the choice requires it.
pub fn get_path(
    conn: &Connection,
    segment: &mut Segment,
    zero_window_check: bool,
) -> Option<PathIndex> {
    let choice = choose_path(conn, segment, zero_window_check)?;
    if choice.restart_carried {
        segment.restart_carried();
    }
    Some(choice.path)
}
