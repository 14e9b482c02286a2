//! Storage claim resource

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{ClaimPhase, ClusterBackend, StorageClaimSpec};
use crate::error::ResourceError;
use crate::poller::Poller;
use crate::result::StorageClaimRecord;
use crate::timing::Timing;

use super::{poll_until_absent, Resource, ResourceKind};

/// A durable storage request; ready once bound to a volume
pub struct StorageClaim {
    spec: StorageClaimSpec,
    timing: Timing,
    backend: Arc<dyn ClusterBackend>,
    poller: Poller,
}

impl StorageClaim {
    /// Create a new storage claim handle; nothing is sent to the backend yet
    pub fn new(spec: StorageClaimSpec, backend: Arc<dyn ClusterBackend>, poller: Poller) -> Self {
        Self {
            spec,
            timing: Timing::new(),
            backend,
            poller,
        }
    }

    /// The spec sent on create
    pub fn spec(&self) -> &StorageClaimSpec {
        &self.spec
    }

    /// Snapshot for the run result
    pub fn record(&self) -> StorageClaimRecord {
        StorageClaimRecord {
            name: self.spec.name.clone(),
            size: self.spec.size.clone(),
            storage_class: self.spec.storage_class.clone(),
            timing: self.timing.clone(),
        }
    }
}

#[async_trait]
impl Resource for StorageClaim {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StorageClaim
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
            "Creating storage claim"
        );
        self.timing.start();
        self.backend.create_storage_claim(&self.spec).await?;
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Storage claim created"
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
                    tracing::debug!(%namespace, %name, "Waiting for storage claim to be bound");
                    backend
                        .get_storage_claim(&namespace, &name)
                        .await
                        .map(|status| status.phase == ClaimPhase::Bound)
                }
            })
            .await?;

        let elapsed = self.timing.finish();
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            elapsed_ms = ?elapsed.map(|d| d.as_millis()),
            "Storage claim bound"
        );
        Ok(())
    }

    async fn delete(&mut self) -> Result<(), ResourceError> {
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Deleting storage claim"
        );
        self.timing.start();
        self.backend
            .delete_storage_claim(&self.spec.namespace, &self.spec.name)
            .await?;
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            "Storage claim deletion started"
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
                tracing::debug!(%namespace, %name, "Waiting for storage claim to be deleted");
                backend.get_storage_claim(&namespace, &name).await
            }
        })
        .await?;

        let elapsed = self.timing.finish();
        tracing::info!(
            namespace = %self.spec.namespace,
            name = %self.spec.name,
            elapsed_ms = ?elapsed.map(|d| d.as_millis()),
            "Storage claim deleted"
        );
        Ok(())
    }
}

impl fmt::Debug for StorageClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClaim")
            .field("spec", &self.spec)
            .field("timing", &self.timing)
            .field("backend", &self.backend.backend_name())
            .field("poller", &self.poller)
            .finish()
    }
}
