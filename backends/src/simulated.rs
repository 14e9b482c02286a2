//! In-memory backend for dry runs
//!
//! Objects bind or become ready after a fixed number of status checks and
//! disappear a fixed number of checks after their delete call. Creating an
//! existing object or touching a missing one fails the same way a real
//! cluster would.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use pvc_bench_core::{
    BackendError, ClaimPhase, ClaimStatus, ClusterBackend, ComputeUnitSpec, StorageClaimSpec,
    UnitStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ObjectKind {
    Claim,
    Unit,
}

#[derive(Debug, Default)]
struct SimulatedObject {
    checks: u32,
    deleting_checks: Option<u32>,
}

type ObjectKey = (ObjectKind, String, String);

/// Simulated cluster
#[derive(Debug)]
pub struct SimulatedBackend {
    objects: Mutex<HashMap<ObjectKey, SimulatedObject>>,
    ready_after: u32,
    gone_after: u32,
    latency: Duration,
}

impl SimulatedBackend {
    /// Create an empty cluster where objects are ready on the second check
    /// and gone on the second check after deletion
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            ready_after: 2,
            gone_after: 2,
            latency: Duration::ZERO,
        }
    }

    /// Number of status checks until an object is bound or ready
    pub fn with_ready_after(mut self, checks: u32) -> Self {
        self.ready_after = checks.max(1);
        self
    }

    /// Number of status checks after deletion until an object is gone
    pub fn with_gone_after(mut self, checks: u32) -> Self {
        self.gone_after = checks.max(1);
        self
    }

    /// Delay added to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of objects currently present (including ones being deleted)
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn create(
        &self,
        kind: ObjectKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), BackendError> {
        self.round_trip().await;

        let key = (kind, namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().await;
        if objects.contains_key(&key) {
            return Err(BackendError::already_exists(format!(
                "{namespace}/{name} already exists"
            )));
        }
        objects.insert(key, SimulatedObject::default());
        trace!(namespace, name, ?kind, "Simulated create");
        Ok(())
    }

    /// Count a status check; returns whether the object is ready
    async fn check(
        &self,
        kind: ObjectKind,
        namespace: &str,
        name: &str,
    ) -> Result<bool, BackendError> {
        self.round_trip().await;

        let key = (kind, namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().await;
        let not_found = || BackendError::not_found(format!("{namespace}/{name} not found"));

        let object = objects.get_mut(&key).ok_or_else(not_found)?;
        let deleting = object.deleting_checks;
        match deleting {
            Some(checks) if checks + 1 >= self.gone_after => {
                objects.remove(&key);
                Err(not_found())
            }
            Some(checks) => {
                object.deleting_checks = Some(checks + 1);
                Ok(true)
            }
            None => {
                object.checks = object.checks.saturating_add(1);
                Ok(object.checks >= self.ready_after)
            }
        }
    }

    async fn delete(
        &self,
        kind: ObjectKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), BackendError> {
        self.round_trip().await;

        let key = (kind, namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().await;
        let object = objects
            .get_mut(&key)
            .ok_or_else(|| BackendError::not_found(format!("{namespace}/{name} not found")))?;
        object.deleting_checks.get_or_insert(0);
        trace!(namespace, name, ?kind, "Simulated delete");
        Ok(())
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterBackend for SimulatedBackend {
    fn backend_name(&self) -> &str {
        "simulated"
    }

    async fn create_storage_claim(&self, spec: &StorageClaimSpec) -> Result<(), BackendError> {
        self.create(ObjectKind::Claim, &spec.namespace, &spec.name).await
    }

    async fn get_storage_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ClaimStatus, BackendError> {
        let bound = self.check(ObjectKind::Claim, namespace, name).await?;
        Ok(ClaimStatus {
            phase: if bound {
                ClaimPhase::Bound
            } else {
                ClaimPhase::Pending
            },
        })
    }

    async fn delete_storage_claim(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.delete(ObjectKind::Claim, namespace, name).await
    }

    async fn create_compute_unit(&self, spec: &ComputeUnitSpec) -> Result<(), BackendError> {
        self.create(ObjectKind::Unit, &spec.namespace, &spec.name).await
    }

    async fn get_compute_unit(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<UnitStatus, BackendError> {
        let ready = self.check(ObjectKind::Unit, namespace, name).await?;
        Ok(UnitStatus { ready })
    }

    async fn delete_compute_unit(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.delete(ObjectKind::Unit, namespace, name).await
    }
}
