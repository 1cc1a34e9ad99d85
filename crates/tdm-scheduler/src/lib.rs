//! # tdm-scheduler
//!
//! Quota-based round ("TDM") path scheduling for multipath reliable
//! transport sessions.
//!
//! Given several usable paths between two endpoints, the scheduler decides at
//! each transmission opportunity which queued segment goes next, which path
//! carries it, and how many bytes that path may take in the current burst.
//! A path keeps receiving units until it used its round allowance, then the
//! scheduler rotates; once every eligible path used its allowance, a new
//! round starts for all of them.
//!
//! ## Crate structure
//!
//! - [`model`]: Connection, paths, segments and the two send queues
//! - [`scheduler`]: Eligibility checks, reinjection path choice, TDM engine
//! - [`config`]: Round size and cwnd policy, TOML loading, hot reload
//! - [`stats`]: Decision counters
//! - [`metrics`]: Prometheus text rendering
//! - [`sim`]: Seeded offline driver for scheduler experiments

pub mod config;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod sim;
pub mod stats;

pub use config::{ConfigError, SchedulerConfig, SchedulerKind, SharedConfig};
pub use model::{Connection, Path, PathIndex, PathState, Segment};
pub use scheduler::tdm::TdmScheduler;
pub use scheduler::{build_scheduler, Decision, PathScheduler, Source};
