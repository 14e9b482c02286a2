//! Latency aggregation over a finished run

use serde::{Deserialize, Serialize};

use crate::result::RunResult;
use crate::timing::Timing;

/// Latency statistics of one resource kind (all values in milliseconds)
///
/// Only resources that reached their target state contribute to the
/// latency fields; `count` is the total number of resources of the kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Number of resources
    pub count: usize,
    /// Number of resources with a measured duration
    pub completed: usize,
    /// Minimum value
    pub min_ms: f64,
    /// Mean value
    pub mean_ms: f64,
    /// 50th percentile (median)
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// Maximum value
    pub max_ms: f64,
}

impl LatencyStats {
    /// Calculate statistics from the timings of one kind
    pub fn from_timings<'a>(timings: impl IntoIterator<Item = &'a Timing>) -> Self {
        let mut count = 0;
        let mut sorted: Vec<f64> = Vec::new();
        for timing in timings {
            count += 1;
            if let Some(ms) = timing.duration_ms() {
                sorted.push(ms);
            }
        }

        if sorted.is_empty() {
            return Self {
                count,
                ..Self::default()
            };
        }

        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let len = sorted.len();

        Self {
            count,
            completed: len,
            min_ms: sorted[0],
            mean_ms: sorted.iter().sum::<f64>() / len as f64,
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            max_ms: sorted[len - 1],
        }
    }
}

/// Summary of a run, as printed after it completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Storage claim wait latencies
    pub storage_claims: LatencyStats,
    /// Compute unit wait latencies
    pub compute_units: LatencyStats,
    /// Workflows joined
    pub workflows: usize,
    /// Errors the mode absorbed
    pub tolerated_errors: usize,
    /// Wall time of the run
    pub elapsed_ms: f64,
}

/// Aggregate a run result into per-kind statistics
pub fn summarize(result: &RunResult) -> RunSummary {
    RunSummary {
        storage_claims: LatencyStats::from_timings(result.storage_claims.iter().map(|r| &r.timing)),
        compute_units: LatencyStats::from_timings(result.compute_units.iter().map(|r| &r.timing)),
        workflows: result.workflows,
        tolerated_errors: result.tolerated_errors,
        elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
    }
}

/// Calculate percentile from sorted values using linear interpolation
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = p * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let frac = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}
