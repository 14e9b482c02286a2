//! Routing of run results to the requested outputs

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use pvc_bench_core::RunResult;

use crate::csv_export::CsvExporter;
use crate::json_export::JsonExporter;

/// Where the results of a run go
///
/// `no_results` turns off every JSON output. The JSON file is skipped when
/// `no_results_file` is set or no path is configured. CSV is independent
/// of the JSON switches.
#[derive(Debug, Clone, Default)]
pub struct ResultsSink {
    /// Skip all JSON output
    pub no_results: bool,
    /// Skip the JSON results file
    pub no_results_file: bool,
    /// JSON results file
    pub results_file: Option<PathBuf>,
    /// Also print the JSON document
    pub stdout: bool,
    /// CSV output file
    pub csv_file: Option<PathBuf>,
}

impl ResultsSink {
    /// A sink that writes the JSON document to `path`
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            results_file: Some(path.into()),
            ..Default::default()
        }
    }

    /// Also print the JSON document
    pub fn with_stdout(mut self, stdout: bool) -> Self {
        self.stdout = stdout;
        self
    }

    /// Also write a CSV file
    pub fn with_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_file = Some(path.into());
        self
    }

    /// The JSON file that will be written, if any
    pub fn json_target(&self) -> Option<&PathBuf> {
        if self.no_results || self.no_results_file {
            return None;
        }
        self.results_file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Write the configured outputs, printing JSON to `out`
    ///
    /// Returns the files written.
    pub fn emit_to<W: Write>(&self, result: &RunResult, out: &mut W) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if let Some(path) = self.json_target() {
            tracing::info!(path = %path.display(), "Writing results");
            JsonExporter::export(result, path)?;
            written.push(path.clone());
        }

        if !self.no_results && self.stdout {
            let json = JsonExporter::to_string(result)?;
            writeln!(out, "{json}").context("printing results")?;
        }

        if let Some(path) = &self.csv_file {
            tracing::info!(path = %path.display(), "Writing csv results");
            CsvExporter::export(result, path)?;
            written.push(path.clone());
        }

        Ok(written)
    }

    /// Write the configured outputs, printing JSON to stdout
    pub fn emit(&self, result: &RunResult) -> Result<Vec<PathBuf>> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.emit_to(result, &mut lock)
    }
}
