//! Client-side throttling of control-plane calls

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use pvc_bench_core::{
    BackendError, ClaimStatus, ClusterBackend, ComputeUnitSpec, StorageClaimSpec, UnitStatus,
};

/// Backend wrapper that takes a permit before every call
///
/// Every create, status check and delete shares one token bucket. A rate
/// of `qps` refills one permit every `1/qps` seconds and lets up to
/// `ceil(qps)` calls through back to back.
pub struct ThrottledBackend {
    inner: Arc<dyn ClusterBackend>,
    limiter: Option<DefaultDirectRateLimiter>,
    qps: f64,
}

impl ThrottledBackend {
    /// Throttle `inner` to `qps` calls per second
    ///
    /// A rate that is not a positive finite number leaves calls unthrottled.
    pub fn new(inner: Arc<dyn ClusterBackend>, qps: f64) -> Self {
        Self {
            inner,
            limiter: quota(qps).map(RateLimiter::direct),
            qps,
        }
    }

    async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

fn quota(qps: f64) -> Option<Quota> {
    if !qps.is_finite() || qps <= 0.0 {
        return None;
    }
    let burst = NonZeroU32::new((qps.ceil() as u32).max(1))?;
    Quota::with_period(Duration::from_secs_f64(1.0 / qps)).map(|q| q.allow_burst(burst))
}

impl std::fmt::Debug for ThrottledBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledBackend")
            .field("inner", &self.inner.backend_name())
            .field("qps", &self.qps)
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

#[async_trait]
impl ClusterBackend for ThrottledBackend {
    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    async fn create_storage_claim(&self, spec: &StorageClaimSpec) -> Result<(), BackendError> {
        self.acquire().await;
        self.inner.create_storage_claim(spec).await
    }

    async fn get_storage_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ClaimStatus, BackendError> {
        self.acquire().await;
        self.inner.get_storage_claim(namespace, name).await
    }

    async fn delete_storage_claim(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.acquire().await;
        self.inner.delete_storage_claim(namespace, name).await
    }

    async fn create_compute_unit(&self, spec: &ComputeUnitSpec) -> Result<(), BackendError> {
        self.acquire().await;
        self.inner.create_compute_unit(spec).await
    }

    async fn get_compute_unit(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<UnitStatus, BackendError> {
        self.acquire().await;
        self.inner.get_compute_unit(namespace, name).await
    }

    async fn delete_compute_unit(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.acquire().await;
        self.inner.delete_compute_unit(namespace, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedBackend;
    use std::collections::BTreeMap;

    fn throttled(qps: f64) -> ThrottledBackend {
        ThrottledBackend::new(Arc::new(SimulatedBackend::new().with_ready_after(1)), qps)
    }

    fn claim(name: &str) -> StorageClaimSpec {
        StorageClaimSpec {
            name: name.to_string(),
            namespace: "t1".to_string(),
            size: "100m".to_string(),
            storage_class: None,
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_invalid_rates_disable_throttling() {
        for qps in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(throttled(qps).limiter.is_none(), "qps {qps}");
        }
    }

    #[test]
    fn test_burst_is_bounded_by_rate() {
        let backend = throttled(2.0);
        let limiter = backend.limiter.as_ref().unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_fractional_rate_allows_single_call() {
        let backend = throttled(0.5);
        let limiter = backend.limiter.as_ref().unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_debug_names_inner_backend() {
        let debug = format!("{:?}", throttled(50.0));
        assert!(debug.contains("simulated"));
        assert!(debug.contains("50.0"));
    }

    #[tokio::test]
    async fn test_throttled_backend_forwards_calls() {
        let backend = throttled(1000.0);
        assert_eq!(backend.backend_name(), "simulated");

        backend.create_storage_claim(&claim("sp-0001")).await.unwrap();
        assert!(backend
            .create_storage_claim(&claim("sp-0001"))
            .await
            .unwrap_err()
            .is_already_exists());

        let status = backend.get_storage_claim("t1", "sp-0001").await.unwrap();
        assert_eq!(status.phase, pvc_bench_core::ClaimPhase::Bound);

        backend.delete_storage_claim("t1", "sp-0001").await.unwrap();
        assert!(backend
            .delete_compute_unit("t1", "sp-0001")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
