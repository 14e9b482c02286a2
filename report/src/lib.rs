//! Report generation for run results
//!
//! This crate provides:
//!
//! - JSON export of a run and its summary
//! - CSV export with one row per resource
//! - A console summary table
//! - `ResultsSink`, which routes a result to the outputs chosen on the command line

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod csv_export;
pub mod json_export;
pub mod sink;
pub mod summary;

pub use csv_export::CsvExporter;
pub use json_export::{JsonExporter, ResultsDocument};
pub use sink::ResultsSink;
pub use summary::{print_summary, render_summary};
