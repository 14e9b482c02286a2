//! Orchestrator for the resource-pair lifecycle
//!
//! The Orchestrator coordinates a complete run:
//! - Building `count` storage claim / compute unit pairs
//! - Spawning one workflow task per resource, with a random pause between pairs
//! - Joining every task, even after a fatal error
//! - Classifying errors against the run mode
//!
//! # Example
//!
//! ```ignore
//! use pvc_bench_core::{Mode, OrchestratorBuilder};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .namespace("t1")
//!     .prefix("sp")
//!     .count(10)
//!     .mode(Mode::Provision)
//!     .backend(backend)
//!     .build()?;
//!
//! let result = orchestrator.run().await?;
//! let summary = summarize(&result);
//! ```

mod aggregator;
mod builder;
mod executor;
mod jitter;

pub use aggregator::{summarize, LatencyStats, RunSummary};
pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;
pub use jitter::LaunchJitter;
