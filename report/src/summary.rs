//! Console summary of a run

use std::fmt::Write as _;

use pvc_bench_core::{LatencyStats, RunSummary};

/// Render the summary as a small fixed-width table
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<14} {:>5} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "kind", "count", "done", "min_ms", "mean_ms", "p50_ms", "p95_ms", "max_ms"
    );
    push_row(&mut out, "storage claim", &summary.storage_claims);
    push_row(&mut out, "compute unit", &summary.compute_units);
    let _ = writeln!(
        out,
        "workflows: {}  tolerated errors: {}  elapsed: {:.0} ms",
        summary.workflows, summary.tolerated_errors, summary.elapsed_ms
    );

    out
}

fn push_row(out: &mut String, kind: &str, stats: &LatencyStats) {
    let _ = writeln!(
        out,
        "{:<14} {:>5} {:>5} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1}",
        kind,
        stats.count,
        stats.completed,
        stats.min_ms,
        stats.mean_ms,
        stats.p50_ms,
        stats.p95_ms,
        stats.max_ms
    );
}

/// Print the summary table to stdout
pub fn print_summary(summary: &RunSummary) {
    print!("{}", render_summary(summary));
}
