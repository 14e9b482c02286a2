//! Per-resource workflows
//!
//! A workflow is the unit of concurrency in pvc-bench: one tokio task per
//! resource, driving it through exactly two steps.
//!
//! - **Provision**: `create()` then `wait_create()`
//! - **Decommission**: `delete()` then `wait_delete()`
//!
//! The wait step runs even when the first step failed: a create rejected
//! with "already exists" still has a resource worth waiting for, and the
//! decision whether an error matters belongs to the orchestrator, not to
//! the workflow. Every error is collected in the [`WorkflowReport`]
//! together with the resource itself, which is handed back to the caller
//! when the task is joined.
//!
//! # Example
//!
//! ```ignore
//! use pvc_bench_core::workflow::Workflow;
//! use pvc_bench_core::Mode;
//!
//! let report = Workflow::new(claim, Mode::Provision).run().await;
//! assert!(report.state.is_terminal());
//! ```

mod executor;

pub use executor::{Workflow, WorkflowEvent, WorkflowReport, WorkflowState};

#[cfg(test)]
mod tests;
