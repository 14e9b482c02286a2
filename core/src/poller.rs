//! Bounded-interval polling
//!
//! A [`Poller`] only knows how often and how long to check; what "ready"
//! means is up to the condition. The same primitive drives create-readiness
//! and delete-confirmation waits.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::config::PollConfig;
use crate::error::PollError;

/// Repeatedly evaluates a condition until it holds, fails, or times out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    /// Create a poller checking every `interval` for at most `timeout`
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Pause between two checks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Overall deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `condition` until it returns `Ok(true)`
    ///
    /// The condition runs immediately, then once per interval.
    /// - `Ok(false)`: not ready yet, keep polling
    /// - `Ok(true)`: done
    /// - `Err(e)`: returned at once as [`PollError::Condition`]; no retry
    ///
    /// If the deadline passes first, [`PollError::DeadlineExceeded`] is
    /// returned. The last check happens at the deadline.
    pub async fn poll<F, Fut, E>(&self, mut condition: F) -> Result<(), PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            if condition().await.map_err(PollError::Condition)? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PollError::DeadlineExceeded(self.timeout));
            }

            sleep(self.interval.min(deadline - now)).await;
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        PollConfig::default().into()
    }
}

impl From<PollConfig> for Poller {
    fn from(config: PollConfig) -> Self {
        Self::new(config.interval, config.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_condition(
        ready_on: usize,
    ) -> (
        Arc<AtomicUsize>,
        impl FnMut() -> std::future::Ready<Result<bool, String>>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let condition = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(Ok(n >= ready_on))
        };
        (calls, condition)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_checks_once() {
        let (calls, condition) = counting_condition(1);
        let start = Instant::now();

        Poller::new(Duration::from_secs(5), Duration::from_secs(60))
            .poll(condition)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_three_checks() {
        let (calls, condition) = counting_condition(3);
        let start = Instant::now();

        Poller::new(Duration::from_secs(5), Duration::from_secs(60))
            .poll(condition)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_returned_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = Poller::new(Duration::from_secs(1), Duration::from_secs(60))
            .poll(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err::<bool, _>("boom".to_string()))
            })
            .await;

        assert!(matches!(result, Err(PollError::Condition(ref e)) if e == "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let (calls, condition) = counting_condition(usize::MAX);
        let start = Instant::now();

        let result = Poller::new(Duration::from_secs(5), Duration::from_secs(12))
            .poll(condition)
            .await;

        assert!(matches!(
            result,
            Err(PollError::DeadlineExceeded(d)) if d == Duration::from_secs(12)
        ));
        // Checks at 0s, 5s, 10s and a final one at the 12s deadline
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[test]
    fn test_from_poll_config() {
        let poller = Poller::from(PollConfig {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(20),
        });
        assert_eq!(poller.interval(), Duration::from_secs(2));
        assert_eq!(poller.timeout(), Duration::from_secs(20));

        let default = Poller::default();
        assert_eq!(default.interval(), Duration::from_secs(5));
        assert_eq!(default.timeout(), Duration::from_secs(1800));
    }
}
