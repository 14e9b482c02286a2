//! Per-resource phase timing

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Start, end and duration of one phase (create-wait or delete-wait)
///
/// Wall-clock timestamps are kept for reporting; the duration itself is
/// measured on the monotonic clock. `duration` is only set once the phase
/// reached its target state, and only once per phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timing {
    /// When the create or delete call was issued
    pub start: Option<DateTime<Utc>>,

    /// When the target state was observed
    pub end: Option<DateTime<Utc>>,

    /// `end - start`, serialized in milliseconds
    #[serde(rename = "duration_ms", with = "duration_ms", default)]
    pub duration: Option<Duration>,

    #[serde(skip)]
    started_at: Option<Instant>,
}

impl Timing {
    /// Create an empty timing
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a phase
    ///
    /// Clears whatever a previous phase recorded.
    pub fn start(&mut self) {
        self.start = Some(Utc::now());
        self.started_at = Some(Instant::now());
        self.end = None;
        self.duration = None;
    }

    /// Complete the current phase and return its duration
    ///
    /// Returns `None` if the phase was never started. Calling it again
    /// returns the first measurement unchanged.
    pub fn finish(&mut self) -> Option<Duration> {
        if self.duration.is_some() {
            return self.duration;
        }

        let started_at = self.started_at?;
        let elapsed = started_at.elapsed();
        self.end = Some(Utc::now());
        self.duration = Some(elapsed);
        Some(elapsed)
    }

    /// Whether the phase has completed
    pub fn is_complete(&self) -> bool {
        self.duration.is_some()
    }

    /// Duration in milliseconds, if complete
    pub fn duration_ms(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64() * 1000.0)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_secs_f64() * 1000.0)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms: Option<f64> = Option::deserialize(d)?;
        Ok(ms.map(|ms| Duration::from_secs_f64(ms.max(0.0) / 1000.0)))
    }
}
