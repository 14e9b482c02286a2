//! pvc-bench-core: Core types for benchmarking storage provisioning
//!
//! This crate provides the building blocks shared by the backends, the
//! reporters and the command line, including:
//!
//! - The cluster backend trait and the object specs it creates
//! - Storage claim and compute unit resources with phase timing
//! - The per-resource workflow and the run orchestrator
//! - Polling with a deadline
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod resource;
pub mod result;
pub mod timing;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use backend::{
    ClaimPhase, ClaimStatus, ClusterBackend, ComputeUnitSpec, StorageClaimSpec, UnitStatus,
};
pub use config::{
    ComputeUnitTemplate, ConfigError, Mode, PollConfig, RunConfig, StorageClaimTemplate,
    APP_NAME, DEFAULT_MAX_JITTER, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
pub use error::*;
pub use orchestrator::{summarize, LatencyStats, Orchestrator, OrchestratorBuilder, RunSummary};
pub use poller::Poller;
pub use resource::{ComputeUnit, Resource, ResourceKind, StorageClaim};
pub use result::{ComputeUnitRecord, RunResult, StorageClaimRecord};
pub use timing::Timing;
pub use workflow::{Workflow, WorkflowEvent, WorkflowReport, WorkflowState};
