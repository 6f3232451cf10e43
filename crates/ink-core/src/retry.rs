//! Bounded retry with jittered exponential backoff.
//!
//! Upstream ports (embedding, vision, blob storage, database) classify their
//! failures as transient or permanent. Call sites wrap transiently-failing
//! operations in a [`RetryConfig`] so the policy lives in one place and the
//! ports stay retry-agnostic.

use std::time::Duration;

use rand::RngExt;

/// Tracing target for retry decisions.
const TRACING_TARGET: &str = "ink_core::retry";

/// Implemented by error types that know whether a retry may succeed.
///
/// Permanent-input failures (bad request, unsupported format, dimension
/// mismatch) must return `false` so they are surfaced immediately.
pub trait Retryable {
    /// Returns true if retrying the failed operation may succeed.
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior on failed operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Jitter fraction in [0, 1] applied to each computed backoff
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            ..Default::default()
        }
    }

    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff: Duration::from_secs(0),
            max_backoff: Duration::from_secs(0),
            backoff_multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the jitter fraction.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Calculate the backoff duration for a given attempt number.
    ///
    /// The base backoff grows exponentially and is capped at `max_backoff`;
    /// jitter then scales the result by a random factor in
    /// `[1 - jitter, 1 + jitter]`.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_millis = (self.initial_backoff.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        let capped = Duration::from_millis(backoff_millis as u64).min(self.max_backoff);

        if self.jitter <= f64::EPSILON {
            return capped;
        }

        let factor = rand::rng().random_range(1.0 - self.jitter..=1.0 + self.jitter);
        Duration::from_millis((capped.as_millis() as f64 * factor) as u64)
    }

    /// Retry an async operation according to this configuration.
    ///
    /// Errors whose [`Retryable::is_retryable`] returns false fail
    /// immediately; everything else is retried up to `max_attempts` times
    /// with backoff between attempts.
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() {
                        tracing::debug!(
                            target: TRACING_TARGET,
                            error = %err,
                            "Non-retryable error, failing immediately"
                        );
                        return Err(err);
                    }

                    last_error = Some(err);

                    // Don't sleep after the last attempt
                    if attempt < self.max_attempts {
                        let backoff = self.calculate_backoff(attempt);
                        tracing::debug!(
                            target: TRACING_TARGET,
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            backoff_ms = backoff.as_millis(),
                            "Retrying operation after backoff"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        // All attempts exhausted; max_attempts >= 0 guarantees at least one error
        Err(last_error.expect("retry loop ran at least one attempt"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct TestError {
        message: &'static str,
        retryable: bool,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn backoff_growth_without_jitter() {
        let config = RetryConfig::default().with_jitter(0.0);

        assert_eq!(config.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(config.calculate_backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_capped_at_max() {
        let config = RetryConfig::default()
            .with_jitter(0.0)
            .with_max_backoff(Duration::from_millis(300));

        assert_eq!(config.calculate_backoff(5), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryConfig::default().with_jitter(0.5);

        for attempt in 0..4 {
            let base = RetryConfig::default()
                .with_jitter(0.0)
                .calculate_backoff(attempt);
            let jittered = config.calculate_backoff(attempt);
            let lower = base.mul_f64(0.5);
            let upper = base.mul_f64(1.5);
            assert!(jittered >= lower && jittered <= upper + Duration::from_millis(1));
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let config = RetryConfig {
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = config
            .retry(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError {
                            message: "transient",
                            retryable: true,
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let config = RetryConfig::default();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<i32, _> = config
            .retry(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(TestError {
                        message: "permanent",
                        retryable: false,
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
