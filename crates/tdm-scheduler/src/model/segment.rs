//! Queued units of the logical data stream and the small path-set type used
//! to remember which paths already carried a unit.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Highest path index a connection can hold.
///
/// Carried-path sets are a `u32` bitmask, one bit per index, so this is also
/// the maximum number of concurrent paths per connection.
pub const MAX_PATHS: u8 = 32;

/// Returns true if sequence number `a` lies before `b` in 32-bit
/// wrapping sequence space.
#[inline]
pub fn seq_before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Stable, 1-based identifier of a path within its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PathIndex(u8);

impl PathIndex {
    /// Returns `None` unless `raw` is in `1..=MAX_PATHS`.
    pub fn new(raw: u8) -> Option<Self> {
        if (1..=MAX_PATHS).contains(&raw) {
            Some(PathIndex(raw))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position used for rotation ordinals and mask bits.
    pub fn ordinal(self) -> u32 {
        u32::from(self.0) - 1
    }

    fn flag(self) -> u32 {
        1u32 << self.ordinal()
    }
}

impl fmt::Display for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

/// Fixed-capacity set of path indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathMask(u32);

impl PathMask {
    pub const EMPTY: PathMask = PathMask(0);

    pub fn contains(self, index: PathIndex) -> bool {
        self.0 & index.flag() != 0
    }

    pub fn insert(&mut self, index: PathIndex) {
        self.0 |= index.flag();
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }
}

/// A contiguous unit of the logical stream queued for transmission.
///
/// Created by the upper layer, dequeued by the transmission layer. The
/// scheduler only inspects segments, apart from restarting the carried-path
/// set of a reinjected unit once every eligible path has carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Data-level sequence number of the first byte.
    pub seq: u32,
    pub payload: Bytes,
    /// Set on the unit carrying this side's close signal.
    pub close_signal: bool,
    carried: PathMask,
}

impl Segment {
    pub fn new(seq: u32, payload: Bytes) -> Self {
        Segment {
            seq,
            payload,
            close_signal: false,
            carried: PathMask::EMPTY,
        }
    }

    /// A unit carrying the close signal.
    pub fn close(seq: u32, payload: Bytes) -> Self {
        Segment {
            close_signal: true,
            ..Segment::new(seq, payload)
        }
    }

    pub fn len(&self) -> u32 {
        u32::try_from(self.payload.len()).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Sequence number one past the last byte.
    pub fn end_seq(&self) -> u32 {
        self.seq.wrapping_add(self.len())
    }

    /// Paths that already carried this exact unit.
    pub fn carried(&self) -> PathMask {
        self.carried
    }

    /// Recorded by the transmission layer once the unit is handed to `path`.
    pub fn mark_carried(&mut self, path: PathIndex) {
        self.carried.insert(path);
    }

    pub(crate) fn restart_carried(&mut self) {
        self.carried.clear();
    }
}
