//! # TDM scheduler simulator
//!
//! Runs the configured scheduler against synthetic paths and prints a JSON
//! report (or Prometheus text with `--prometheus`).
//!
//! ## Usage
//!
//! ```bash
//! # Two identical paths, default round size
//! tdm-sim
//!
//! # Short rounds, three paths, config from file
//! tdm-sim --config sched.toml --paths 3 --segments 5000
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tdm_scheduler::config::{SchedulerConfig, SharedConfig};
use tdm_scheduler::metrics::render_prometheus;
use tdm_scheduler::scheduler::build_scheduler;
use tdm_scheduler::scheduler::eligibility::Checks;
use tdm_scheduler::sim::{SimConfig, SimPathConfig, Simulation};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tdm-sim", about = "Offline simulator for the TDM path scheduler")]
struct Cli {
    /// Scheduler config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Round size override.
    #[arg(long)]
    round_size: Option<u32>,

    /// Number of synthetic paths.
    #[arg(long, default_value_t = 2)]
    paths: u8,

    /// Segments queued before the run.
    #[arg(long, default_value_t = 2000)]
    segments: u32,

    /// Payload bytes per segment.
    #[arg(long, default_value_t = 1200)]
    segment_size: u32,

    /// Maximum number of ticks.
    #[arg(long, default_value_t = 500)]
    ticks: u32,

    /// Per-path congestion window, in units.
    #[arg(long, default_value_t = 20)]
    cwnd: u32,

    /// Per-tick acknowledgment probability of each in-flight unit.
    #[arg(long, default_value_t = 0.5)]
    ack_probability: f64,

    /// Requeue the last sent unit for reinjection every N ticks (0 = never).
    #[arg(long, default_value_t = 25)]
    reinject_every: u32,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print Prometheus text instead of JSON.
    #[arg(long, default_value_t = false)]
    prometheus: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SchedulerConfig::from_toml_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SchedulerConfig::default(),
    };
    if let Some(round_size) = cli.round_size {
        config.round_size = round_size;
    }
    let shared = SharedConfig::new(config).context("invalid scheduler config")?;

    tracing::info!(
        scheduler = config.kind.as_str(),
        round_size = config.round_size,
        cwnd_limited = config.cwnd_limited,
        paths = cli.paths,
        segments = cli.segments,
        "tdm-sim starting"
    );

    let path = SimPathConfig {
        mss: 1460,
        cwnd: cli.cwnd,
        ack_probability: cli.ack_probability,
    };
    let mut sim = Simulation::new(SimConfig {
        seed: cli.seed,
        ticks: cli.ticks,
        segments: cli.segments,
        segment_size: cli.segment_size,
        paths: vec![path; usize::from(cli.paths)],
        reinject_every: Some(cli.reinject_every).filter(|n| *n > 0),
    })?;

    let mut scheduler = build_scheduler(&shared);
    let report = sim.run(scheduler.as_mut())?;

    tracing::info!(
        ticks = report.ticks,
        sent = report.sent_units,
        pending = report.pending_segments,
        resets = report.stats.round_resets,
        "tdm-sim finished"
    );

    if cli.prometheus {
        let paths = sim
            .connection()
            .snapshot(config.round_size, Checks::selection(&config));
        print!("{}", render_prometheus(&report.stats, &paths));
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
