//! Benchmarked resources
//!
//! A pair consists of one [`StorageClaim`] and one [`ComputeUnit`] sharing
//! a name. Both implement [`Resource`]: a single backend call to start a
//! phase (create or delete) and a bounded wait for the phase to finish.
//! Each resource records its own [`Timing`].
//!
//! Resource steps never retry and never classify errors; whatever the
//! backend or the poller reports is returned unchanged.

mod compute_unit;
mod storage_claim;

pub use compute_unit::ComputeUnit;
pub use storage_claim::StorageClaim;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ResourceError};
use crate::poller::Poller;
use crate::timing::Timing;

/// The two resource variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Durable storage request
    StorageClaim,
    /// Workload mounting a storage claim
    ComputeUnit,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::StorageClaim => f.write_str("storage claim"),
            ResourceKind::ComputeUnit => f.write_str("compute unit"),
        }
    }
}

/// Lifecycle operations of a benchmarked resource
#[async_trait]
pub trait Resource: Send + Sync + fmt::Debug {
    /// Which variant this is
    fn kind(&self) -> ResourceKind;

    /// Object name
    fn name(&self) -> &str;

    /// Namespace
    fn namespace(&self) -> &str;

    /// Timing of the current phase
    fn timing(&self) -> &Timing;

    /// Issue the create call; does not wait for readiness
    async fn create(&mut self) -> Result<(), ResourceError>;

    /// Wait until the resource is ready, then record the phase duration
    async fn wait_create(&mut self) -> Result<(), ResourceError>;

    /// Issue the delete call (foreground propagation)
    async fn delete(&mut self) -> Result<(), ResourceError>;

    /// Wait until the backend reports the resource gone, then record the
    /// phase duration
    async fn wait_delete(&mut self) -> Result<(), ResourceError>;
}

/// Poll `probe` until it reports "not found"
///
/// Any successful fetch means the object still exists; any error other
/// than "not found" ends the wait.
pub(crate) async fn poll_until_absent<F, Fut, T>(
    poller: &Poller,
    mut probe: F,
) -> Result<(), ResourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    poller
        .poll(|| {
            let fetch = probe();
            async move {
                match fetch.await {
                    Ok(_) => Ok(false),
                    Err(e) if e.is_not_found() => Ok(true),
                    Err(e) => Err(e),
                }
            }
        })
        .await
        .map_err(ResourceError::from)
}
