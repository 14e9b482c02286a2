//! Run result types handed to the reporters

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::timing::Timing;

/// Timing record of one storage claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageClaimRecord {
    /// Claim name
    pub name: String,
    /// Requested capacity
    pub size: String,
    /// Storage class, if one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Phase timing
    pub timing: Timing,
}

/// Timing record of one compute unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeUnitRecord {
    /// Unit name
    pub name: String,
    /// Container image
    pub image: String,
    /// Mounted claim
    pub claim_name: String,
    /// Phase timing
    pub timing: Timing,
}

/// Outcome of a successful run
///
/// Built once after every workflow has been joined. Records are ordered by
/// pair sequence number, not by completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Namespace of the fleet
    pub namespace: String,

    /// Provision or decommission
    pub mode: Mode,

    /// One record per storage claim
    pub storage_claims: Vec<StorageClaimRecord>,

    /// One record per compute unit
    pub compute_units: Vec<ComputeUnitRecord>,

    /// Number of workflows joined (always twice the number of pairs)
    pub workflows: usize,

    /// Errors absorbed because the mode expects them
    pub tolerated_errors: usize,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the last workflow was joined
    pub finished_at: DateTime<Utc>,

    /// Wall time of the whole run, serialized in milliseconds
    #[serde(rename = "elapsed_ms", with = "elapsed_ms")]
    pub elapsed: Duration,
}

impl RunResult {
    /// Number of pairs in the run
    pub fn pair_count(&self) -> usize {
        self.storage_claims.len()
    }

    /// Whether every resource reached its target state
    pub fn all_complete(&self) -> bool {
        self.storage_claims.iter().all(|r| r.timing.is_complete())
            && self.compute_units.iter().all(|r| r.timing.is_complete())
    }
}

mod elapsed_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
