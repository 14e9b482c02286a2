//! Builder pattern for Orchestrator construction

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::ClusterBackend;
use crate::config::{Mode, PollConfig, RunConfig};
use crate::error::{BenchError, BenchResult};
use crate::workflow::WorkflowEvent;

use super::executor::Orchestrator;
use super::jitter::LaunchJitter;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .namespace("t1")
///     .count(100)
///     .mode(Mode::Decommission)
///     .backend(backend)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: RunConfig,
    backend: Option<Arc<dyn ClusterBackend>>,
    events_tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            backend: None,
            events_tx: None,
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the name prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Set the number of pairs
    pub fn count(mut self, count: usize) -> Self {
        self.config.count = count;
        self
    }

    /// Set the mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the poll cadence
    pub fn poll(mut self, interval: Duration, timeout: Duration) -> Self {
        self.config.poll = PollConfig { interval, timeout };
        self
    }

    /// Set the maximum pause between two launched pairs
    pub fn max_jitter(mut self, max_jitter: Duration) -> Self {
        self.config.max_jitter = max_jitter;
        self
    }

    /// Set the backend
    pub fn backend(mut self, backend: Arc<dyn ClusterBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Report every joined workflow on `tx`
    pub fn events(mut self, tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is set, or if configuration
    /// validation fails.
    pub fn build(self) -> BenchResult<Orchestrator> {
        let backend = self
            .backend
            .ok_or_else(|| BenchError::missing_config("backend"))?;

        self.config.validate()?;

        let jitter = LaunchJitter::new(self.config.max_jitter);

        Ok(Orchestrator {
            config: self.config,
            backend,
            jitter,
            events_tx: self.events_tx,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
