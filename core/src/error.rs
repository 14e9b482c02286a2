//! Error types for pvc-bench-core

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::resource::ResourceKind;

/// Classification of a failed backend call
///
/// The orchestrator only needs to tell "already exists" and "not found"
/// apart from everything else; the backends map their native errors
/// onto these three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The object already exists (conflict on create)
    AlreadyExists,
    /// The object does not exist
    NotFound,
    /// Any other failure (transport, authorization, validation, ...)
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::NotFound => "not found",
            ErrorKind::Other => "backend error",
        };
        f.write_str(s)
    }
}

/// Error returned by a [`ClusterBackend`](crate::backend::ClusterBackend) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human readable message from the backend
    pub message: String,
}

impl BackendError {
    /// Create a new backend error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The object already exists
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// The object was not found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Any other backend failure
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    /// Whether this error reports an existing object
    pub fn is_already_exists(&self) -> bool {
        self.kind == ErrorKind::AlreadyExists
    }

    /// Whether this error reports a missing object
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Failure of a bounded poll
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The condition never became true before the deadline
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The condition itself returned an error
    #[error("poll condition failed: {0}")]
    Condition(E),
}

/// Error surfaced by a single resource step (create, wait, delete)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The backend rejected a call
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Waiting for the target state took longer than the poll timeout
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl ResourceError {
    /// The backend classification, if this is a backend error
    pub fn backend_kind(&self) -> Option<ErrorKind> {
        match self {
            ResourceError::Backend(e) => Some(e.kind),
            ResourceError::DeadlineExceeded(_) => None,
        }
    }

    /// Whether the backend reported an existing object
    pub fn is_already_exists(&self) -> bool {
        self.backend_kind() == Some(ErrorKind::AlreadyExists)
    }

    /// Whether the backend reported a missing object
    pub fn is_not_found(&self) -> bool {
        self.backend_kind() == Some(ErrorKind::NotFound)
    }

    /// Whether a poll ran out of time
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ResourceError::DeadlineExceeded(_))
    }
}

impl From<PollError<BackendError>> for ResourceError {
    fn from(err: PollError<BackendError>) -> Self {
        match err {
            PollError::DeadlineExceeded(timeout) => ResourceError::DeadlineExceeded(timeout),
            PollError::Condition(e) => ResourceError::Backend(e),
        }
    }
}

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required builder field was not set
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A workflow hit an error that the current mode does not tolerate
    #[error("{kind} {namespace}/{name} failed: {source}")]
    Workflow {
        /// Kind of the failing resource
        kind: ResourceKind,
        /// Namespace of the failing resource
        namespace: String,
        /// Name of the failing resource
        name: String,
        /// The first intolerable error observed
        #[source]
        source: ResourceError,
    },

    /// A workflow task panicked or was aborted
    #[error("workflow task did not complete: {0}")]
    Join(String),
}

impl BenchError {
    /// Create a missing-configuration error
    pub fn missing_config(field: &'static str) -> Self {
        BenchError::MissingConfig(field)
    }

    /// The resource error behind a workflow failure, if any
    pub fn resource_error(&self) -> Option<&ResourceError> {
        match self {
            BenchError::Workflow { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for run-level operations
pub type BenchResult<T> = std::result::Result<T, BenchError>;
