//! # Prometheus Metrics
//!
//! Renders scheduler counters and per-path quota state in Prometheus text
//! exposition format.

use std::fmt::Write;

use crate::model::PathSnapshot;
use crate::stats::SchedulerStats;

/// Render scheduler statistics and path snapshots as Prometheus text.
pub fn render_prometheus(stats: &SchedulerStats, paths: &[PathSnapshot]) -> String {
    let mut out = String::with_capacity(1024);

    // ── Per-path gauges ─────────────────────────────────────────

    let _ = writeln!(
        out,
        "# HELP tdm_path_quota Units granted to the path in the current round."
    );
    let _ = writeln!(out, "# TYPE tdm_path_quota gauge");
    for p in paths {
        let _ = writeln!(
            out,
            "tdm_path_quota{{path=\"{}\",view=\"{}\"}} {}",
            p.index.get(),
            p.view.as_str(),
            p.quota
        );
    }

    let _ = writeln!(
        out,
        "# HELP tdm_path_in_flight Units in flight on the path."
    );
    let _ = writeln!(out, "# TYPE tdm_path_in_flight gauge");
    for p in paths {
        let _ = writeln!(
            out,
            "tdm_path_in_flight{{path=\"{}\",state=\"{}\"}} {}",
            p.index.get(),
            p.state,
            p.in_flight
        );
    }

    // ── Scheduler counters ──────────────────────────────────────

    let _ = writeln!(
        out,
        "# HELP tdm_decisions_total Scheduling decisions by source queue."
    );
    let _ = writeln!(out, "# TYPE tdm_decisions_total counter");
    for (source, value) in [
        ("primary", stats.primary),
        ("reinjected", stats.reinjected),
        ("fallback", stats.fallback),
    ] {
        let _ = writeln!(out, "tdm_decisions_total{{source=\"{source}\"}} {value}");
    }

    for (name, help, value) in [
        (
            "tdm_round_resets_total",
            "Round-exhaustion quota resets.",
            stats.round_resets,
        ),
        (
            "tdm_no_path_total",
            "Calls with data pending but no eligible path.",
            stats.no_path,
        ),
        (
            "tdm_recheck_aborts_total",
            "Selections dropped by the final full eligibility check.",
            stats.recheck_aborts,
        ),
        (
            "tdm_carried_restarts_total",
            "Reinjected units whose carried-path set was cleared.",
            stats.carried_restarts,
        ),
    ] {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let _ = writeln!(out, "{name} {value}");
    }

    out
}
