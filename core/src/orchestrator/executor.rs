//! Orchestrator execution logic

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};

use crate::backend::{ClusterBackend, ComputeUnitSpec, StorageClaimSpec};
use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::poller::Poller;
use crate::resource::{ComputeUnit, Resource, StorageClaim};
use crate::result::RunResult;
use crate::workflow::{Workflow, WorkflowEvent, WorkflowReport};

use super::jitter::LaunchJitter;

/// A joined workflow, tagged with its pair index
enum Completion {
    Claim(usize, WorkflowReport<StorageClaim>),
    Unit(usize, WorkflowReport<ComputeUnit>),
}

/// Running totals while draining the join set
#[derive(Debug, Default)]
struct Tally {
    joined: usize,
    tolerated: usize,
    fatal: usize,
    first_fatal: Option<BenchError>,
}

impl Tally {
    fn record_fatal(&mut self, err: BenchError) {
        self.fatal += 1;
        if self.first_fatal.is_none() {
            self.first_fatal = Some(err);
        }
    }
}

/// Orchestrator manages the run lifecycle
///
/// Responsible for building the pairs, spawning one workflow per
/// resource, and joining all of them into a single outcome.
pub struct Orchestrator {
    /// Run configuration
    pub(crate) config: RunConfig,

    /// Backend (shared by every resource)
    pub(crate) backend: Arc<dyn ClusterBackend>,

    /// Pause between launched pairs
    pub(crate) jitter: LaunchJitter,

    /// Optional observer notified as workflows are joined
    pub(crate) events_tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl Orchestrator {
    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Build the storage claim and compute unit of every pair, in order
    pub fn build_pairs(&self) -> Vec<(StorageClaim, ComputeUnit)> {
        let poller = Poller::from(self.config.poll);

        (1..=self.config.count)
            .map(|index| {
                let name = self.config.pair_name(index);

                let claim = StorageClaim::new(
                    StorageClaimSpec {
                        name: name.clone(),
                        namespace: self.config.namespace.clone(),
                        size: self.config.storage.size.clone(),
                        storage_class: self.config.storage.storage_class.clone(),
                        labels: self.config.labels.clone(),
                    },
                    Arc::clone(&self.backend),
                    poller,
                );

                let unit = ComputeUnit::new(
                    ComputeUnitSpec {
                        name: name.clone(),
                        namespace: self.config.namespace.clone(),
                        image: self.config.compute.image.clone(),
                        command: self.config.compute.command.clone(),
                        claim_name: name,
                        mount_path: self.config.compute.mount_path.clone(),
                        labels: self.config.labels.clone(),
                    },
                    Arc::clone(&self.backend),
                    poller,
                );

                (claim, unit)
            })
            .collect()
    }

    /// Run the benchmark
    ///
    /// Spawns two workflows per pair and joins every one of them before
    /// returning, also when a fatal error was observed early. The first
    /// error the mode does not tolerate is returned.
    pub async fn run(&self) -> BenchResult<RunResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let count = self.config.count;
        let mode = self.config.mode;

        tracing::info!(
            namespace = %self.config.namespace,
            prefix = %self.config.prefix,
            count,
            mode = %mode,
            backend = self.backend.backend_name(),
            "Starting run"
        );

        let mut tasks = JoinSet::new();
        for (index, (claim, unit)) in self.build_pairs().into_iter().enumerate() {
            tasks.spawn(async move {
                Completion::Claim(index, Workflow::new(claim, mode).run().await)
            });
            tasks.spawn(async move {
                Completion::Unit(index, Workflow::new(unit, mode).run().await)
            });

            if index + 1 < count {
                let delay = self.jitter.next_delay();
                tracing::debug!(
                    pair = index + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Pausing before next pair"
                );
                sleep(delay).await;
            }
        }

        let mut claims: Vec<Option<StorageClaim>> = (0..count).map(|_| None).collect();
        let mut units: Vec<Option<ComputeUnit>> = (0..count).map(|_| None).collect();
        let mut tally = Tally::default();

        while let Some(joined) = tasks.join_next().await {
            tally.joined += 1;
            match joined {
                Ok(Completion::Claim(index, report)) => {
                    self.observe(&report, &mut tally);
                    claims[index] = Some(report.resource);
                }
                Ok(Completion::Unit(index, report)) => {
                    self.observe(&report, &mut tally);
                    units[index] = Some(report.resource);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Workflow task did not complete");
                    tally.record_fatal(BenchError::Join(e.to_string()));
                }
            }
        }

        let elapsed = start.elapsed();
        debug_assert_eq!(tally.joined, 2 * count);

        if let Some(err) = tally.first_fatal {
            tracing::error!(
                fatal_errors = tally.fatal,
                tolerated_errors = tally.tolerated,
                workflows = tally.joined,
                elapsed_ms = elapsed.as_millis() as u64,
                "Run failed"
            );
            return Err(err);
        }

        let storage_claims = claims
            .into_iter()
            .map(|slot| slot.map(|claim| claim.record()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BenchError::Join("storage claim workflow missing".into()))?;
        let compute_units = units
            .into_iter()
            .map(|slot| slot.map(|unit| unit.record()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BenchError::Join("compute unit workflow missing".into()))?;

        tracing::info!(
            workflows = tally.joined,
            tolerated_errors = tally.tolerated,
            elapsed_ms = elapsed.as_millis() as u64,
            "Run completed"
        );

        Ok(RunResult {
            namespace: self.config.namespace.clone(),
            mode,
            storage_claims,
            compute_units,
            workflows: tally.joined,
            tolerated_errors: tally.tolerated,
            started_at,
            finished_at: Utc::now(),
            elapsed,
        })
    }

    /// Classify the errors of one joined workflow
    fn observe<R: Resource>(&self, report: &WorkflowReport<R>, tally: &mut Tally) {
        let resource = &report.resource;

        for err in &report.errors {
            if self.config.mode.tolerates(err) {
                tally.tolerated += 1;
                tracing::warn!(
                    kind = %resource.kind(),
                    namespace = resource.namespace(),
                    name = resource.name(),
                    error = %err,
                    "Ignoring expected error"
                );
            } else {
                tracing::error!(
                    kind = %resource.kind(),
                    namespace = resource.namespace(),
                    name = resource.name(),
                    error = %err,
                    "Workflow failed"
                );
                tally.record_fatal(BenchError::Workflow {
                    kind: resource.kind(),
                    namespace: resource.namespace().to_string(),
                    name: resource.name().to_string(),
                    source: err.clone(),
                });
            }
        }

        if let Some(tx) = &self.events_tx {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(report.event());
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_name())
            .field("jitter", &self.jitter)
            .finish()
    }
}
