//! Entities the scheduler consults: the connection, its paths, and the
//! queued segments.

pub mod connection;
pub mod path;
pub mod segment;

pub use connection::{Connection, PathError, PathSnapshot};
pub use path::{AckMode, Path, PathState, PathView};
pub use segment::{PathIndex, PathMask, Segment, MAX_PATHS};
