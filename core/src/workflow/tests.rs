//! Tests for the workflow module

use super::*;
use crate::config::Mode;
use crate::error::{BackendError, ResourceError};
use crate::resource::{Resource, ResourceKind};
use crate::timing::Timing;

use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared buffer a test subscriber writes formatted events into
#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Scripted resource
// ============================================================================

#[derive(Debug)]
struct ScriptedResource {
    timing: Timing,
    issue_result: Result<(), ResourceError>,
    wait_result: Result<(), ResourceError>,
    steps: Vec<&'static str>,
    log: Option<LogBuffer>,
    logged_before_wait: String,
}

impl ScriptedResource {
    fn new() -> Self {
        Self {
            timing: Timing::new(),
            issue_result: Ok(()),
            wait_result: Ok(()),
            steps: Vec::new(),
            log: None,
            logged_before_wait: String::new(),
        }
    }

    fn issue_fails(mut self, err: impl Into<ResourceError>) -> Self {
        self.issue_result = Err(err.into());
        self
    }

    fn wait_fails(mut self, err: impl Into<ResourceError>) -> Self {
        self.wait_result = Err(err.into());
        self
    }

    /// Snapshot `log` when the wait step starts
    fn watch_log(mut self, log: LogBuffer) -> Self {
        self.log = Some(log);
        self
    }

    fn issue(&mut self, step: &'static str) -> Result<(), ResourceError> {
        self.steps.push(step);
        self.timing.start();
        self.issue_result.clone()
    }

    fn wait(&mut self, step: &'static str) -> Result<(), ResourceError> {
        self.steps.push(step);
        if let Some(log) = &self.log {
            self.logged_before_wait = log.contents();
        }
        self.wait_result.clone()?;
        self.timing.finish();
        Ok(())
    }
}

#[async_trait]
impl Resource for ScriptedResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StorageClaim
    }

    fn name(&self) -> &str {
        "scripted-0001"
    }

    fn namespace(&self) -> &str {
        "t1"
    }

    fn timing(&self) -> &Timing {
        &self.timing
    }

    async fn create(&mut self) -> Result<(), ResourceError> {
        self.issue("create")
    }

    async fn wait_create(&mut self) -> Result<(), ResourceError> {
        self.wait("wait_create")
    }

    async fn delete(&mut self) -> Result<(), ResourceError> {
        self.issue("delete")
    }

    async fn wait_delete(&mut self) -> Result<(), ResourceError> {
        self.wait("wait_delete")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_workflow_state_terminal() {
    assert!(!WorkflowState::Pending.is_terminal());
    assert!(!WorkflowState::Issued.is_terminal());
    assert!(!WorkflowState::Waiting.is_terminal());
    assert!(WorkflowState::Ready.is_terminal());
    assert!(WorkflowState::Failed.is_terminal());
    assert!(WorkflowState::TimedOut.is_terminal());
}

#[tokio::test]
async fn test_provision_runs_create_then_wait() {
    let report = Workflow::new(ScriptedResource::new(), Mode::Provision)
        .run()
        .await;

    assert_eq!(report.resource.steps, vec!["create", "wait_create"]);
    assert_eq!(report.state, WorkflowState::Ready);
    assert!(report.errors.is_empty());
    assert!(report.resource.timing().is_complete());
}

#[tokio::test]
async fn test_decommission_runs_delete_then_wait() {
    let report = Workflow::new(ScriptedResource::new(), Mode::Decommission)
        .run()
        .await;

    assert_eq!(report.resource.steps, vec!["delete", "wait_delete"]);
    assert_eq!(report.state, WorkflowState::Ready);
}

#[tokio::test]
async fn test_wait_runs_even_when_issue_fails() {
    let resource = ScriptedResource::new().issue_fails(BackendError::already_exists("exists"));
    let report = Workflow::new(resource, Mode::Provision).run().await;

    assert_eq!(report.resource.steps, vec!["create", "wait_create"]);
    assert_eq!(report.state, WorkflowState::Ready);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].is_already_exists());
}

#[tokio::test]
async fn test_issue_error_is_warned_before_waiting() {
    let log = LogBuffer::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let resource = ScriptedResource::new()
        .issue_fails(BackendError::other("admission denied"))
        .watch_log(log.clone());
    let report = Workflow::new(resource, Mode::Provision).run().await;

    let before_wait = &report.resource.logged_before_wait;
    assert!(before_wait.contains("WARN"));
    assert!(before_wait.contains("Issue step returned an error"));
    assert!(before_wait.contains("scripted-0001"));
    assert!(before_wait.contains("admission denied"));
    assert_eq!(report.state, WorkflowState::Ready);
}

#[tokio::test]
async fn test_both_steps_failing_reports_both_errors_in_order() {
    let resource = ScriptedResource::new()
        .issue_fails(BackendError::other("admission denied"))
        .wait_fails(BackendError::not_found("missing"));
    let report = Workflow::new(resource, Mode::Provision).run().await;

    assert_eq!(report.state, WorkflowState::Failed);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(
        report.errors[0].backend_kind(),
        Some(crate::error::ErrorKind::Other)
    );
    assert!(report.errors[1].is_not_found());
    assert!(!report.resource.timing().is_complete());
}

#[tokio::test]
async fn test_deadline_maps_to_timed_out() {
    let resource =
        ScriptedResource::new().wait_fails(ResourceError::DeadlineExceeded(Duration::from_secs(1)));
    let report = Workflow::new(resource, Mode::Decommission).run().await;

    assert_eq!(report.state, WorkflowState::TimedOut);
    assert_eq!(report.errors.len(), 1);
    assert!(report.resource.timing().duration.is_none());
}

#[tokio::test]
async fn test_report_event() {
    let resource = ScriptedResource::new().wait_fails(BackendError::other("boom"));
    let report = Workflow::new(resource, Mode::Provision).run().await;

    let event = report.event();
    assert_eq!(event.kind, ResourceKind::StorageClaim);
    assert_eq!(event.name, "scripted-0001");
    assert_eq!(event.state, WorkflowState::Failed);
    assert!(event.duration_ms.is_none());
    assert_eq!(event.errors, vec!["backend error: boom".to_string()]);
}
