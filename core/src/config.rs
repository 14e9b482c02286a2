//! Run configuration types

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

/// Name prefix and label value used when nothing else is configured
pub const APP_NAME: &str = "shiny-potato";

/// Interval between two status checks of the same resource
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Upper bound for a single create or delete wait
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound of the random pause between two launched pairs
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(3000);

/// Longest name a pod container may carry (DNS-1123 label)
const MAX_NAME_LEN: usize = 63;

/// What a run does to the fleet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Create every pair and wait until it is ready
    #[default]
    Provision,
    /// Delete every pair and wait until it is gone
    Decommission,
}

impl Mode {
    /// Short name, as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Provision => "deploy",
            Mode::Decommission => "clean",
        }
    }

    /// Whether an error is expected in this mode and must not fail the run
    ///
    /// Provisioning tolerates objects that already exist, decommissioning
    /// tolerates objects that are already gone. Everything else is fatal.
    pub fn tolerates(&self, err: &ResourceError) -> bool {
        match self {
            Mode::Provision => err.is_already_exists(),
            Mode::Decommission => err.is_not_found(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poll cadence for create and delete waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between two status checks
    pub interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Shape of every storage claim in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClaimTemplate {
    /// Requested capacity, in backend quantity notation (e.g. `100m`, `1Gi`)
    pub size: String,

    /// Storage class; `None` lets the backend pick its default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl Default for StorageClaimTemplate {
    fn default() -> Self {
        Self {
            size: "100m".to_string(),
            storage_class: None,
        }
    }
}

/// Shape of every compute unit in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnitTemplate {
    /// Container image
    pub image: String,
    /// Container command; the default keeps the container idle
    pub command: Vec<String>,
    /// Where the claim is mounted inside the container
    pub mount_path: String,
}

impl Default for ComputeUnitTemplate {
    fn default() -> Self {
        Self {
            image: "docker.io/alpine:latest".to_string(),
            command: vec!["tail".into(), "-f".into(), "/dev/null".into()],
            mount_path: "/mnt/test".to_string(),
        }
    }
}

/// Run configuration
///
/// Everything the orchestrator needs to build and drive a fleet. Passed
/// explicitly to [`OrchestratorBuilder`](crate::orchestrator::OrchestratorBuilder);
/// there is no process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Namespace every pair lives in
    pub namespace: String,

    /// Name prefix; pairs are named `<prefix>-0001`, `<prefix>-0002`, ...
    pub prefix: String,

    /// Number of pairs
    pub count: usize,

    /// Provision or decommission
    pub mode: Mode,

    /// Poll cadence for waits
    pub poll: PollConfig,

    /// Upper bound of the random pause between launching two pairs
    pub max_jitter: Duration,

    /// Storage claim shape
    pub storage: StorageClaimTemplate,

    /// Compute unit shape
    pub compute: ComputeUnitTemplate,

    /// Labels attached to every object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            prefix: APP_NAME.to_string(),
            count: 3,
            mode: Mode::default(),
            poll: PollConfig::default(),
            max_jitter: DEFAULT_MAX_JITTER,
            storage: StorageClaimTemplate::default(),
            compute: ComputeUnitTemplate::default(),
            labels: BTreeMap::from([("app".to_string(), APP_NAME.to_string())]),
        }
    }
}

impl RunConfig {
    /// Create a config for `count` pairs in `namespace`
    pub fn new(namespace: impl Into<String>, count: usize) -> Self {
        Self {
            namespace: namespace.into(),
            count,
            ..Default::default()
        }
    }

    /// Set the name prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the poll cadence
    pub fn with_poll(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll = PollConfig { interval, timeout };
        self
    }

    /// Set the maximum launch jitter
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Set the storage class
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage.storage_class = Some(storage_class.into());
        self
    }

    /// Set the requested claim size
    pub fn with_claim_size(mut self, size: impl Into<String>) -> Self {
        self.storage.size = size.into();
        self
    }

    /// Set the container image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.compute.image = image.into();
        self
    }

    /// Name of the `index`-th pair (1-based)
    pub fn pair_name(&self, index: usize) -> String {
        format!("{}-{:04}", self.prefix, index)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::InvalidNamespace(
                "namespace must not be empty".into(),
            ));
        }

        if self.prefix.is_empty() {
            return Err(ConfigError::InvalidPrefix("prefix must not be empty".into()));
        }

        let valid_chars = self
            .prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let starts_alnum = self
            .prefix
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        if !valid_chars || !starts_alnum {
            return Err(ConfigError::InvalidPrefix(format!(
                "'{}' must consist of lowercase alphanumerics or '-' and start with an alphanumeric",
                self.prefix
            )));
        }

        let longest = self.pair_name(self.count.max(1)).len();
        if longest > MAX_NAME_LEN {
            return Err(ConfigError::InvalidPrefix(format!(
                "generated names would be {longest} characters, at most {MAX_NAME_LEN} are allowed"
            )));
        }

        if self.poll.interval.is_zero() {
            return Err(ConfigError::InvalidPoll(
                "poll interval must be positive".into(),
            ));
        }

        if self.poll.timeout.is_zero() {
            return Err(ConfigError::InvalidPoll("poll timeout must be positive".into()));
        }

        if self.storage.size.is_empty() {
            return Err(ConfigError::InvalidTemplate(
                "storage claim size must not be empty".into(),
            ));
        }

        if self.compute.image.is_empty() {
            return Err(ConfigError::InvalidTemplate(
                "container image must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid namespace
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Invalid name prefix
    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Invalid poll cadence
    #[error("Invalid poll settings: {0}")]
    InvalidPoll(String),

    /// Invalid resource template
    #[error("Invalid resource template: {0}")]
    InvalidTemplate(String),
}
