//! Cluster backend implementations for pvc-bench
//!
//! This crate provides implementations of the `ClusterBackend` trait for:
//!
//! - Kubernetes (storage claims are PersistentVolumeClaims, compute units are Pods)
//! - An in-memory simulator, for dry runs without a cluster
//!
//! Any backend can be wrapped in [`ThrottledBackend`] to cap the rate of
//! control-plane calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kubernetes;
pub mod simulated;
pub mod throttle;

pub use kubernetes::KubeBackend;
pub use simulated::SimulatedBackend;
pub use throttle::ThrottledBackend;
