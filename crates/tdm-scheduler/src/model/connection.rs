//! The multipath session: its paths and the two send queues.

use std::collections::VecDeque;

use serde::Serialize;
use thiserror::Error;

use super::path::{Path, PathView};
use super::segment::{PathIndex, Segment};
use crate::scheduler::eligibility::{self, Checks};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("{0} is already part of the connection")]
    Duplicate(PathIndex),
}

/// Observability snapshot of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathSnapshot {
    pub index: PathIndex,
    pub state: &'static str,
    pub quota: u32,
    pub view: PathView,
    pub in_flight: u32,
    pub cwnd: u32,
}

/// Aggregate session coordinating several paths for one data stream.
///
/// Paths are kept in insertion order; that order is the scan order of every
/// scheduling pass.
#[derive(Debug, Default)]
pub struct Connection {
    paths: Vec<Path>,
    primary: VecDeque<Segment>,
    reinject: VecDeque<Segment>,
    /// Degraded single-path mode; quota accounting is bypassed.
    pub fallback: bool,
    /// Path that delivered the peer's close signal. Our close-signal reply
    /// must leave on it.
    pub close_path: Option<PathIndex>,
    /// Rotation ordinal the transport expects next. Diagnostic only.
    pub expected_ordinal: Option<u32>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a path. Its quota starts at zero.
    pub fn add_path(&mut self, path: Path) -> Result<(), PathError> {
        if self.path(path.index()).is_some() {
            return Err(PathError::Duplicate(path.index()));
        }
        self.paths.push(path);
        Ok(())
    }

    /// Tears down a path. Its quota is discarded with it.
    pub fn remove_path(&mut self, index: PathIndex) -> Option<Path> {
        let pos = self.paths.iter().position(|p| p.index() == index)?;
        if self.close_path == Some(index) {
            self.close_path = None;
        }
        Some(self.paths.remove(pos))
    }

    pub fn path(&self, index: PathIndex) -> Option<&Path> {
        self.paths.iter().find(|p| p.index() == index)
    }

    pub fn path_mut(&mut self, index: PathIndex) -> Option<&mut Path> {
        self.paths.iter_mut().find(|p| p.index() == index)
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub(crate) fn paths_mut(&mut self) -> &mut [Path] {
        &mut self.paths
    }

    /// Records that the peer's close signal arrived on `index`.
    pub fn on_peer_close(&mut self, index: PathIndex) {
        self.close_path = Some(index);
    }

    // ─── Queues ─────────────────────────────────────────────────────────

    pub fn push_primary(&mut self, segment: Segment) {
        self.primary.push_back(segment);
    }

    pub fn push_reinject(&mut self, segment: Segment) {
        self.reinject.push_back(segment);
    }

    pub fn primary_head(&self) -> Option<&Segment> {
        self.primary.front()
    }

    pub fn reinject_head(&self) -> Option<&Segment> {
        self.reinject.front()
    }

    pub(crate) fn reinject_head_mut(&mut self) -> Option<&mut Segment> {
        self.reinject.front_mut()
    }

    /// Dequeues the primary head once the transmission layer accepted it.
    pub fn pop_primary(&mut self) -> Option<Segment> {
        self.primary.pop_front()
    }

    /// Dequeues the reinjection head once the transmission layer accepted it.
    pub fn pop_reinject(&mut self) -> Option<Segment> {
        self.reinject.pop_front()
    }

    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    pub fn reinject_len(&self) -> usize {
        self.reinject.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.primary.is_empty() || !self.reinject.is_empty()
    }

    /// Per-path view for the primary head under `checks`.
    ///
    /// Paths failing eligibility report [`PathView::Ineligible`] regardless
    /// of their quota.
    pub fn snapshot(&self, round_size: u32, checks: Checks) -> Vec<PathSnapshot> {
        let head = self.primary_head();
        self.paths
            .iter()
            .map(|path| {
                let view = if eligibility::is_available(self, path, head, checks) {
                    path.quota_view(round_size)
                } else {
                    PathView::Ineligible
                };
                PathSnapshot {
                    index: path.index(),
                    state: path.state.as_str(),
                    quota: path.quota(),
                    view,
                    in_flight: path.in_flight,
                    cwnd: path.cwnd,
                }
            })
            .collect()
    }
}
