//! Offline driver that runs a scheduler against synthetic paths.
//!
//! Each tick the scheduler is called until it backs off, every decision is
//! "transmitted" (dequeued, cursors and in-flight advanced), and a seeded RNG
//! acknowledges in-flight units per path. Runs are reproducible for a seed.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::path::PathSchedState;
use crate::model::{Connection, Path, PathIndex, Segment, MAX_PATHS};
use crate::scheduler::{Decision, PathScheduler, Source};
use crate::stats::SchedulerStats;

/// Receive window the synthetic peer keeps open ahead of `snd_una`.
const PEER_WINDOW: u32 = 1 << 20;

/// Guards a tick against a policy that never backs off.
const MAX_SENDS_PER_TICK: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimPathConfig {
    pub mss: u32,
    pub cwnd: u32,
    /// Chance per tick that one in-flight unit is acknowledged.
    pub ack_probability: f64,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub seed: u64,
    pub ticks: u32,
    pub segments: u32,
    pub segment_size: u32,
    pub paths: Vec<SimPathConfig>,
    /// Requeue the last sent unit for reinjection every N ticks.
    pub reinject_every: Option<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let path = SimPathConfig {
            mss: 1460,
            cwnd: 20,
            ack_probability: 0.5,
        };
        SimConfig {
            seed: 1,
            ticks: 500,
            segments: 2000,
            segment_size: 1200,
            paths: vec![path.clone(), path],
            reinject_every: Some(25),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PathReport {
    pub units: u64,
    pub bytes: u64,
    /// Longest run of consecutive decisions on this path.
    pub longest_burst: u64,
    pub final_quota: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub scheduler: &'static str,
    pub ticks: u32,
    pub sent_units: u64,
    pub acked_units: u64,
    pub pending_segments: usize,
    pub paths: BTreeMap<u8, PathReport>,
    pub stats: SchedulerStats,
}

pub struct Simulation {
    cfg: SimConfig,
    rng: StdRng,
    conn: Connection,
    reports: BTreeMap<u8, PathReport>,
    burst: Option<(PathIndex, u64)>,
    last_sent: Option<Segment>,
    sent_units: u64,
    acked_units: u64,
}

impl Simulation {
    pub fn new(cfg: SimConfig) -> Result<Self> {
        if cfg.paths.is_empty() {
            bail!("simulation needs at least one path");
        }
        if cfg.paths.len() > usize::from(MAX_PATHS) {
            bail!("simulation supports at most {MAX_PATHS} paths");
        }

        let mut conn = Connection::new();
        let mut reports = BTreeMap::new();
        for (pos, cfg_path) in cfg.paths.iter().enumerate() {
            let raw = u8::try_from(pos + 1).context("path index overflow")?;
            let index = PathIndex::new(raw).context("path index out of range")?;
            let mut path = Path::new(index, cfg_path.mss);
            path.cwnd = cfg_path.cwnd;
            path.wnd_end = PEER_WINDOW;
            conn.add_path(path)?;
            reports.insert(raw, PathReport::default());
        }

        let size = usize::try_from(cfg.segment_size).context("segment size")?;
        let payload = Bytes::from(vec![0u8; size]);
        for i in 0..cfg.segments {
            conn.push_primary(Segment::new(
                i.wrapping_mul(cfg.segment_size),
                payload.clone(),
            ));
        }

        Ok(Simulation {
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
            conn,
            reports,
            burst: None,
            last_sent: None,
            sent_units: 0,
            acked_units: 0,
        })
    }

    /// Connection state, e.g. for snapshots after [`Simulation::run`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn run(&mut self, scheduler: &mut dyn PathScheduler) -> Result<SimReport> {
        debug!(
            scheduler = scheduler.name(),
            paths = self.cfg.paths.len(),
            segments = self.cfg.segments,
            "starting simulation"
        );

        let mut ticks = 0;
        for tick in 0..self.cfg.ticks {
            ticks = tick + 1;
            if let Some(every) = self.cfg.reinject_every.filter(|n| *n > 0) {
                if tick > 0 && tick % every == 0 {
                    if let Some(seg) = self.last_sent.take() {
                        self.conn.push_reinject(seg);
                    }
                }
            }

            for _ in 0..MAX_SENDS_PER_TICK {
                let Some(decision) = scheduler.next_segment(&mut self.conn) else {
                    break;
                };
                self.transmit(&decision)?;
            }

            self.acknowledge();

            let idle = self.conn.paths().iter().all(|p| p.in_flight == 0);
            if !self.conn.has_pending() && idle {
                break;
            }
        }

        for path in self.conn.paths() {
            if let Some(report) = self.reports.get_mut(&path.index().get()) {
                report.final_quota = path.quota();
            }
        }

        Ok(SimReport {
            scheduler: scheduler.name(),
            ticks,
            sent_units: self.sent_units,
            acked_units: self.acked_units,
            pending_segments: self.conn.primary_len() + self.conn.reinject_len(),
            paths: self.reports.clone(),
            stats: scheduler.stats().clone(),
        })
    }

    fn transmit(&mut self, decision: &Decision) -> Result<()> {
        let mut segment = match decision.source {
            Source::Reinjected => self.conn.pop_reinject(),
            Source::Primary | Source::Fallback => self.conn.pop_primary(),
        }
        .context("decision for an empty queue")?;

        let path = self
            .conn
            .path_mut(decision.path)
            .with_context(|| format!("decision for unknown {}", decision.path))?;
        let len = segment.len();
        let units = PathSchedState::units_for(len, path.mss);
        path.in_flight += units;
        path.write_seq = path.write_seq.wrapping_add(len);
        path.snd_nxt = path.write_seq;
        segment.mark_carried(decision.path);

        self.sent_units += u64::from(units);
        let report = self.reports.entry(decision.path.get()).or_default();
        report.units += u64::from(units);
        report.bytes += u64::from(len);

        let run = match self.burst {
            Some((path, run)) if path == decision.path => run + 1,
            _ => 1,
        };
        self.burst = Some((decision.path, run));
        report.longest_burst = report.longest_burst.max(run);

        self.last_sent = Some(segment);
        Ok(())
    }

    fn acknowledge(&mut self) {
        for (path, cfg_path) in self.conn.paths_mut().iter_mut().zip(&self.cfg.paths) {
            let mut acked = 0;
            for _ in 0..path.in_flight {
                if self.rng.random::<f64>() < cfg_path.ack_probability {
                    acked += 1;
                }
            }
            path.in_flight -= acked;
            path.snd_una = path
                .snd_una
                .wrapping_add(acked.saturating_mul(path.mss))
                .min(path.snd_nxt);
            path.wnd_end = path.snd_una.wrapping_add(PEER_WINDOW);
            self.acked_units += u64::from(acked);
        }
    }
}
