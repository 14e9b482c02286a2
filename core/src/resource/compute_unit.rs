//! Compute unit resource

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{ClusterBackend, ComputeUnitSpec};
use crate::error::ResourceError;
use crate::poller::Poller;
use crate::result::ComputeUnitRecord;
use crate::timing::Timing;

use super::{poll_until_absent, Resource, ResourceKind};

/// A schedulable workload mounting exactly one storage claim
///
/// The claim reference is part of the spec and fixed at construction.
pub struct ComputeUnit {
    spec: ComputeUnitSpec,
    timing: Timing,
    backend: Arc<dyn ClusterBackend>,
    poller: Poller,
}

impl ComputeUnit {
    /// Create a new compute unit handle; nothing is sent to the backend yet
    pub fn new(spec: ComputeUnitSpec, backend: Arc<dyn ClusterBackend>, poller: Poller) -> Self {
        Self {
            spec,
            timing: Timing::new(),
            backend,
            poller,
        }
    }

    /// The spec sent on create
    pub fn spec(&self) -> &ComputeUnitSpec {
        &self.spec
    }

    /// Name of the mounted storage claim
    pub fn claim_name(&self) -> &str {
        &self.spec.claim_name
    }

    /// Snapshot for the run result
    pub fn record(&self) -> ComputeUnitRecord {
        ComputeUnitRecord {
            name: self.spec.name.clone(),
            image: self.spec.image.clone(),
            claim_name: self.spec.claim_name.clone(),
            timing: self.timing.clone(),
        }
    }
}

#[async_trait]
impl Resource for ComputeUnit {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ComputeUnit
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn namespace(&self) -> &str {
        &self.spec.namespace
    }

    fn timing(&self) -> &Timing {
        &self.timing
    }

    async fn create(&mut self) -> Result<(), ResourceError> {
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            claim = %self.spec.claim_name,
            "Creating compute unit"
        );
        self.timing.start();
        self.backend.create_compute_unit(&self.spec).await?;
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Compute unit created"
        );
        Ok(())
    }

    async fn wait_create(&mut self) -> Result<(), ResourceError> {
        let backend = Arc::clone(&self.backend);
        let namespace = self.spec.namespace.clone();
        let name = self.spec.name.clone();

        self.poller
            .poll(move || {
                let backend = Arc::clone(&backend);
                let namespace = namespace.clone();
                let name = name.clone();
                async move {
                    tracing::debug!(%namespace, %name, "Waiting for compute unit to be ready");
                    backend
                        .get_compute_unit(&namespace, &name)
                        .await
                        .map(|status| status.ready)
                }
            })
            .await?;

        let elapsed = self.timing.finish();
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            elapsed_ms = ?elapsed.map(|d| d.as_millis()),
            "Compute unit ready"
        );
        Ok(())
    }

    async fn delete(&mut self) -> Result<(), ResourceError> {
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Deleting compute unit"
        );
        self.timing.start();
        self.backend
            .delete_compute_unit(&self.spec.namespace, &self.spec.name)
            .await?;
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Compute unit deletion started"
        );
        Ok(())
    }

    async fn wait_delete(&mut self) -> Result<(), ResourceError> {
        let backend = Arc::clone(&self.backend);
        let namespace = self.spec.namespace.clone();
        let name = self.spec.name.clone();

        poll_until_absent(&self.poller, move || {
            let backend = Arc::clone(&backend);
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                tracing::debug!(%namespace, %name, "Waiting for compute unit to be deleted");
                backend.get_compute_unit(&namespace, &name).await
            }
        })
        .await?;

        let elapsed = self.timing.finish();
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            elapsed_ms = ?elapsed.map(|d| d.as_millis()),
            "Compute unit deleted"
        );
        Ok(())
    }
}

impl fmt::Debug for ComputeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeUnit")
            .field("spec", &self.spec)
            .field("timing", &self.timing)
            .field("backend", &self.backend.backend_name())
            .field("poller", &self.poller)
            .finish()
    }
}
