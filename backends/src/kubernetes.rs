//! Kubernetes backend
//!
//! Storage claims map to PersistentVolumeClaims and compute units to Pods
//! that mount them. Status checks read `status.phase` of the claim and the
//! `Ready` condition of the pod.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource,
    Pod, PodSpec, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use pvc_bench_core::{
    BackendError, ClaimPhase, ClaimStatus, ClusterBackend, ComputeUnitSpec, StorageClaimSpec,
    UnitStatus, APP_NAME,
};

/// Access mode requested for every claim
const ACCESS_MODE: &str = "ReadWriteOnce";

/// Kubernetes backend
#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
}

impl KubeBackend {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig file, or the default lookup
    /// (`KUBECONFIG`, `~/.kube/config`, in-cluster) when `path` is `None`
    pub async fn connect(path: Option<&Path>) -> Result<Self, BackendError> {
        let config = match path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    BackendError::other(format!("reading kubeconfig {}: {e}", path.display()))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| BackendError::other(format!("loading kubeconfig: {e}")))?
            }
            None => Config::infer()
                .await
                .map_err(|e| BackendError::other(format!("inferring cluster config: {e}")))?,
        };

        debug!(cluster_url = %config.cluster_url, "Connecting to cluster");

        let client = Client::try_from(config)
            .map_err(|e| BackendError::other(format!("building client: {e}")))?;
        Ok(Self::new(client))
    }

    fn claims(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl ClusterBackend for KubeBackend {
    fn backend_name(&self) -> &str {
        "kubernetes"
    }

    async fn create_storage_claim(&self, spec: &StorageClaimSpec) -> Result<(), BackendError> {
        self.claims(&spec.namespace)
            .create(&PostParams::default(), &storage_claim_manifest(spec))
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn get_storage_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ClaimStatus, BackendError> {
        let claim = self.claims(namespace).get(name).await.map_err(classify)?;
        Ok(ClaimStatus {
            phase: claim_phase(&claim),
        })
    }

    async fn delete_storage_claim(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.claims(namespace)
            .delete(name, &DeleteParams::foreground())
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn create_compute_unit(&self, spec: &ComputeUnitSpec) -> Result<(), BackendError> {
        self.pods(&spec.namespace)
            .create(&PostParams::default(), &compute_unit_manifest(spec))
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn get_compute_unit(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<UnitStatus, BackendError> {
        let pod = self.pods(namespace).get(name).await.map_err(classify)?;
        Ok(UnitStatus {
            ready: pod_is_ready(&pod),
        })
    }

    async fn delete_compute_unit(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.pods(namespace)
            .delete(name, &DeleteParams::foreground())
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Map an API error onto the backend error kinds
pub fn classify(err: kube::Error) -> BackendError {
    match &err {
        kube::Error::Api(ae) if ae.code == 409 => BackendError::already_exists(ae.message.clone()),
        kube::Error::Api(ae) if ae.code == 404 => BackendError::not_found(ae.message.clone()),
        _ => BackendError::other(err.to_string()),
    }
}

fn metadata(name: &str, namespace: &str, labels: &BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels.clone()),
        ..Default::default()
    }
}

/// Build the PersistentVolumeClaim for a storage claim
pub fn storage_claim_manifest(spec: &StorageClaimSpec) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(&spec.name, &spec.namespace, &spec.labels),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![ACCESS_MODE.to_string()]),
            storage_class_name: spec.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(spec.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the Pod for a compute unit
///
/// One container, named after the pod, with the claim mounted read-write.
pub fn compute_unit_manifest(spec: &ComputeUnitSpec) -> Pod {
    Pod {
        metadata: metadata(&spec.name, &spec.namespace, &spec.labels),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: spec.name.clone(),
                image: Some(spec.image.clone()),
                command: Some(spec.command.clone()),
                volume_mounts: Some(vec![VolumeMount {
                    name: APP_NAME.to_string(),
                    mount_path: spec.mount_path.clone(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: APP_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: spec.claim_name.clone(),
                    read_only: Some(false),
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Current phase of a claim; a claim without status is still pending
pub fn claim_phase(claim: &PersistentVolumeClaim) -> ClaimPhase {
    claim
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .map(ClaimPhase::parse)
        .unwrap_or(ClaimPhase::Pending)
}

/// Whether the pod's `Ready` condition is `True`
pub fn pod_is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PersistentVolumeClaimStatus, PodCondition, PodStatus};
    use kube::core::ErrorResponse;

    fn labels() -> BTreeMap<String, String> {
        BTreeMap::from([("app".to_string(), APP_NAME.to_string())])
    }

    fn claim_spec() -> StorageClaimSpec {
        StorageClaimSpec {
            name: "sp-0001".to_string(),
            namespace: "t1".to_string(),
            size: "100m".to_string(),
            storage_class: Some("standard".to_string()),
            labels: labels(),
        }
    }

    fn unit_spec() -> ComputeUnitSpec {
        ComputeUnitSpec {
            name: "sp-0001".to_string(),
            namespace: "t1".to_string(),
            image: "docker.io/alpine:latest".to_string(),
            command: vec!["tail".into(), "-f".into(), "/dev/null".into()],
            claim_name: "sp-0001".to_string(),
            mount_path: "/mnt/test".to_string(),
            labels: labels(),
        }
    }

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {code}"),
            reason: String::new(),
            code,
        })
    }

    fn pod_with_conditions(conditions: Vec<(&str, &str)>) -> Pod {
        Pod {
            status: Some(PodStatus {
                conditions: Some(
                    conditions
                        .into_iter()
                        .map(|(type_, status)| PodCondition {
                            type_: type_.to_string(),
                            status: status.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_api_errors() {
        assert!(classify(api_error(409)).is_already_exists());
        assert!(classify(api_error(404)).is_not_found());

        let other = classify(api_error(500));
        assert!(!other.is_already_exists());
        assert!(!other.is_not_found());
    }

    #[test]
    fn test_storage_claim_manifest() {
        let claim = storage_claim_manifest(&claim_spec());

        assert_eq!(claim.metadata.name.as_deref(), Some("sp-0001"));
        assert_eq!(claim.metadata.namespace.as_deref(), Some("t1"));
        assert_eq!(claim.metadata.labels, Some(labels()));

        let spec = claim.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name.as_deref(), Some("standard"));
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("100m".to_string())));
    }

    #[test]
    fn test_storage_claim_manifest_default_class() {
        let mut spec = claim_spec();
        spec.storage_class = None;

        let claim = storage_claim_manifest(&spec);
        assert!(claim.spec.unwrap().storage_class_name.is_none());
    }

    #[test]
    fn test_compute_unit_manifest_mounts_claim() {
        let pod = compute_unit_manifest(&unit_spec());
        let spec = pod.spec.unwrap();

        assert_eq!(spec.containers.len(), 1);
        let container = &spec.containers[0];
        assert_eq!(container.name, "sp-0001");
        assert_eq!(container.image.as_deref(), Some("docker.io/alpine:latest"));
        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].mount_path, "/mnt/test");

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes[0].name, mounts[0].name);
        let source = volumes[0].persistent_volume_claim.as_ref().unwrap();
        assert_eq!(source.claim_name, "sp-0001");
        assert_eq!(source.read_only, Some(false));
    }

    #[test]
    fn test_claim_phase() {
        let mut claim = storage_claim_manifest(&claim_spec());
        assert_eq!(claim_phase(&claim), ClaimPhase::Pending);

        claim.status = Some(PersistentVolumeClaimStatus {
            phase: Some("Bound".to_string()),
            ..Default::default()
        });
        assert_eq!(claim_phase(&claim), ClaimPhase::Bound);
    }

    #[test]
    fn test_pod_readiness() {
        assert!(!pod_is_ready(&Pod::default()));
        assert!(!pod_is_ready(&pod_with_conditions(vec![
            ("PodScheduled", "True"),
            ("Ready", "False"),
        ])));
        assert!(pod_is_ready(&pod_with_conditions(vec![
            ("PodScheduled", "True"),
            ("Ready", "True"),
        ])));
    }
}
