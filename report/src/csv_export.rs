//! CSV export functionality

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use pvc_bench_core::{ResourceKind, RunResult, Timing};

/// Writes one row per resource: claims first, then units, in pair order
pub struct CsvExporter;

impl CsvExporter {
    /// Column names
    pub const HEADERS: [&'static str; 5] = ["kind", "name", "start", "end", "duration_ms"];

    /// Write all rows to `writer`
    pub fn write<W: Write>(result: &RunResult, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(Self::HEADERS)?;

        for claim in &result.storage_claims {
            wtr.write_record(row(ResourceKind::StorageClaim, &claim.name, &claim.timing))?;
        }
        for unit in &result.compute_units {
            wtr.write_record(row(ResourceKind::ComputeUnit, &unit.name, &unit.timing))?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export all rows to a file
    pub fn export(result: &RunResult, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating csv file {}", path.display()))?;
        Self::write(result, file).with_context(|| format!("writing csv file {}", path.display()))
    }
}

fn row(kind: ResourceKind, name: &str, timing: &Timing) -> [String; 5] {
    [
        kind.to_string(),
        name.to_string(),
        timing.start.map(|t| t.to_rfc3339()).unwrap_or_default(),
        timing.end.map(|t| t.to_rfc3339()).unwrap_or_default(),
        timing
            .duration_ms()
            .map(|ms| format!("{ms:.3}"))
            .unwrap_or_default(),
    ]
}
