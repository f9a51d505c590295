//! Bounded exponential backoff for fallible async operations.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::TRACING_TARGET_RETRY;

/// Retry strategy for operations that cross a network boundary.
///
/// The default performs no retries, so a single failure is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 means no retries).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    /// Default delay before the first retry.
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
    /// Default upper bound for a single delay.
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);
    /// Default backoff multiplier.
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;

    /// Creates an exponential policy with the default backoff bounds.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Self::DEFAULT_INITIAL_BACKOFF,
            max_backoff: Self::DEFAULT_MAX_BACKOFF,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    /// Creates a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Sets the maximum backoff duration.
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Returns `true` if this policy performs at least one retry.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `retry` (0-based), capped at `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let millis = (self.initial_backoff.as_millis() as f64)
            * self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let max_millis = self.max_backoff.as_millis() as f64;
        Duration::from_millis(millis.clamp(0.0, max_millis) as u64)
    }

    /// Runs `operation`, retrying failures accepted by `should_retry`.
    ///
    /// The last error is returned once the retries are exhausted or the
    /// predicate rejects an error.
    pub async fn retry_if<F, Fut, T, E, P>(&self, mut operation: F, mut should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
        E: fmt::Display,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if retry < self.max_retries && should_retry(&error) => {
                    let backoff = self.backoff_for(retry);
                    retry += 1;
                    tracing::debug!(
                        target: TRACING_TARGET_RETRY,
                        error = %error,
                        retry = retry,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "Retrying operation after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::Error;

    #[test]
    fn test_default_is_no_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert!(!policy.is_enabled());
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::exponential(3);
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_max_backoff() {
        let policy = RetryPolicy::exponential(3).with_max_backoff(Duration::from_millis(300));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(300));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let policy = RetryPolicy::exponential(3);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .retry_if(
                || {
                    let calls = calls.clone();
                    async move {
                        let current = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        if current < 3 {
                            Err(Error::sink_delivery("unreachable"))
                        } else {
                            Ok(42)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let policy = RetryPolicy::exponential(2);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .retry_if(
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(Error::sink_delivery("unreachable"))
                    }
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_predicate_rejects_retry() {
        let policy = RetryPolicy::exponential(5);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .retry_if(
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(Error::validation("bad request"))
                    }
                },
                |_| false,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::no_retry()
            .retry_if(
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(Error::sink_delivery("unreachable"))
                    }
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
