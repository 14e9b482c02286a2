//! Random pause between launched pairs

use std::time::Duration;

use rand_distr::{Distribution, Uniform};

/// Uniform delay in `[0, max)` used to stagger backend load
///
/// The pause only spreads requests over time; nothing relies on it for
/// ordering.
#[derive(Debug, Clone)]
pub struct LaunchJitter {
    distribution: Option<Uniform<u64>>,
    max: Duration,
}

impl LaunchJitter {
    /// Create a jitter source; a zero `max` disables the pause
    pub fn new(max: Duration) -> Self {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        let distribution = (max_ms > 0).then(|| Uniform::new(0, max_ms));
        Self { distribution, max }
    }

    /// Upper bound of the pause
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw the next pause
    pub fn next_delay(&self) -> Duration {
        match &self.distribution {
            Some(distribution) => {
                let mut rng = rand::thread_rng();
                Duration::from_millis(distribution.sample(&mut rng))
            }
            None => Duration::ZERO,
        }
    }
}
