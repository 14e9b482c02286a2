//! Cluster backend trait
//!
//! This trait is defined in core so the orchestrator can be tested against
//! mocks. Implementations live in the `pvc-bench-backends` crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Everything a backend needs to create one storage claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClaimSpec {
    /// Object name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Requested capacity (e.g. `100m`, `1Gi`)
    pub size: String,
    /// Storage class; `None` selects the backend default
    pub storage_class: Option<String>,
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Everything a backend needs to create one compute unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnitSpec {
    /// Object name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Container image
    pub image: String,
    /// Container command
    pub command: Vec<String>,
    /// Name of the storage claim mounted by this unit
    pub claim_name: String,
    /// Mount point of the claim inside the container
    pub mount_path: String,
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Binding phase of a storage claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimPhase {
    /// Waiting for a volume
    Pending,
    /// Bound to a volume; usable
    Bound,
    /// The bound volume disappeared
    Lost,
    /// The backend did not report a phase we know
    Unknown,
}

impl ClaimPhase {
    /// Parse a phase as reported by the backend
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => ClaimPhase::Pending,
            "Bound" => ClaimPhase::Bound,
            "Lost" => ClaimPhase::Lost,
            _ => ClaimPhase::Unknown,
        }
    }
}

/// Observed state of a storage claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimStatus {
    /// Current binding phase
    pub phase: ClaimPhase,
}

/// Observed state of a compute unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStatus {
    /// Whether the unit's readiness condition is true
    pub ready: bool,
}

/// Control-plane operations used by the benchmark
///
/// Every call is independent and may be issued concurrently from many
/// tasks. Deletes must use foreground propagation: the object only goes
/// away once its dependents are finalized. Errors must be classified with
/// [`ErrorKind`](crate::error::ErrorKind) so the orchestrator can tell
/// "already exists" and "not found" apart from real failures.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Backend identifier (e.g. "kubernetes", "simulated")
    fn backend_name(&self) -> &str;

    /// Create a storage claim; does not wait for it to bind
    async fn create_storage_claim(&self, spec: &StorageClaimSpec) -> Result<(), BackendError>;

    /// Fetch the current state of a storage claim
    async fn get_storage_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ClaimStatus, BackendError>;

    /// Delete a storage claim with foreground propagation
    async fn delete_storage_claim(&self, namespace: &str, name: &str) -> Result<(), BackendError>;

    /// Create a compute unit; does not wait for it to become ready
    async fn create_compute_unit(&self, spec: &ComputeUnitSpec) -> Result<(), BackendError>;

    /// Fetch the current state of a compute unit
    async fn get_compute_unit(&self, namespace: &str, name: &str)
        -> Result<UnitStatus, BackendError>;

    /// Delete a compute unit with foreground propagation
    async fn delete_compute_unit(&self, namespace: &str, name: &str) -> Result<(), BackendError>;
}
