//! Workflow execution

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::error::ResourceError;
use crate::resource::{Resource, ResourceKind};

/// Progress of a single workflow
///
/// `Pending → Issued → Waiting → {Ready, Failed, TimedOut}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Not started
    Pending,
    /// Create or delete call returned
    Issued,
    /// Polling for the target state
    Waiting,
    /// Target state reached (ready, or gone when decommissioning)
    Ready,
    /// The wait ended with a backend error
    Failed,
    /// The wait ran out of time
    TimedOut,
}

impl WorkflowState {
    /// Whether the workflow has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Ready | WorkflowState::Failed | WorkflowState::TimedOut
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Pending => "pending",
            WorkflowState::Issued => "issued",
            WorkflowState::Waiting => "waiting",
            WorkflowState::Ready => "ready",
            WorkflowState::Failed => "failed",
            WorkflowState::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// What a finished workflow hands back to the orchestrator
#[derive(Debug)]
pub struct WorkflowReport<R> {
    /// The resource, with its timing filled in
    pub resource: R,
    /// Terminal state
    pub state: WorkflowState,
    /// Errors from both steps, in order
    pub errors: Vec<ResourceError>,
}

impl<R: Resource> WorkflowReport<R> {
    /// Progress notification for this report
    pub fn event(&self) -> WorkflowEvent {
        WorkflowEvent {
            kind: self.resource.kind(),
            name: self.resource.name().to_string(),
            state: self.state,
            duration_ms: self.resource.timing().duration_ms(),
            errors: self.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Notification sent to observers when a workflow has been joined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource name
    pub name: String,
    /// Terminal state
    pub state: WorkflowState,
    /// Phase duration, when the target state was reached
    pub duration_ms: Option<f64>,
    /// Rendered errors
    pub errors: Vec<String>,
}

/// Drives one resource through one phase
pub struct Workflow<R> {
    resource: R,
    mode: Mode,
    state: WorkflowState,
    errors: Vec<ResourceError>,
}

impl<R: Resource> Workflow<R> {
    /// Create a pending workflow
    pub fn new(resource: R, mode: Mode) -> Self {
        Self {
            resource,
            mode,
            state: WorkflowState::Pending,
            errors: Vec::new(),
        }
    }

    /// Run both steps and return the report
    ///
    /// Never returns early: the wait step runs whatever the first step
    /// returned, and the report is produced exactly once.
    pub async fn run(mut self) -> WorkflowReport<R> {
        tracing::debug!(
            kind = %self.resource.kind(),
            name = self.resource.name(),
            mode = %self.mode,
            "Workflow started"
        );

        let issued = match self.mode {
            Mode::Provision => self.resource.create().await,
            Mode::Decommission => self.resource.delete().await,
        };
        self.state = WorkflowState::Issued;
        if let Err(e) = issued {
            // Whether this is fatal is decided when the workflow is joined
            tracing::warn!(
                kind = %self.resource.kind(),
                namespace = self.resource.namespace(),
                name = self.resource.name(),
                mode = %self.mode,
                error = %e,
                "Issue step returned an error"
            );
            self.errors.push(e);
        }

        self.state = WorkflowState::Waiting;
        let waited = match self.mode {
            Mode::Provision => self.resource.wait_create().await,
            Mode::Decommission => self.resource.wait_delete().await,
        };

        self.state = match waited {
            Ok(()) => WorkflowState::Ready,
            Err(e) => {
                let state = if e.is_deadline_exceeded() {
                    WorkflowState::TimedOut
                } else {
                    WorkflowState::Failed
                };
                self.errors.push(e);
                state
            }
        };

        tracing::debug!(
            kind = %self.resource.kind(),
            name = self.resource.name(),
            state = %self.state,
            errors = self.errors.len(),
            "Workflow finished"
        );

        WorkflowReport {
            resource: self.resource,
            state: self.state,
            errors: self.errors,
        }
    }
}

impl<R: Resource> fmt::Debug for Workflow<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("resource", &self.resource)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("errors", &self.errors)
            .finish()
    }
}
