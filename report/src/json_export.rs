//! JSON export functionality

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use pvc_bench_core::{summarize, RunResult, RunSummary};

/// What gets written: the full result plus its aggregated summary
#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    /// The run, flattened at the top level
    #[serde(flatten)]
    pub result: &'a RunResult,
    /// Aggregated latencies
    pub summary: RunSummary,
}

impl<'a> ResultsDocument<'a> {
    /// Build the document for a run
    pub fn new(result: &'a RunResult) -> Self {
        Self {
            result,
            summary: summarize(result),
        }
    }
}

/// Writes run results as pretty-printed JSON
pub struct JsonExporter;

impl JsonExporter {
    /// Render the results document
    pub fn to_string(result: &RunResult) -> Result<String> {
        serde_json::to_string_pretty(&ResultsDocument::new(result))
            .context("serializing run results")
    }

    /// Write the results document to `writer`
    pub fn write<W: Write>(result: &RunResult, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &ResultsDocument::new(result))
            .context("writing run results")
    }

    /// Export the results document to a file
    pub fn export(result: &RunResult, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("creating results file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        Self::write(result, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("flushing results file {}", path.display()))?;
        Ok(())
    }
}
