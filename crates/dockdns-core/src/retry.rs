//! Bounded retry with capped exponential backoff
//!
//! Retry policy is owned by the core, never by provider implementations.
//! Providers execute exactly one API call per invocation and return an
//! error; [`RetryPolicy::run`] decides whether and when to try again.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Explicit retry policy: attempt ceiling plus a backoff function
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at
/// `max`. With the defaults that is 1s, 2s, 4s, 8s across five attempts.
/// There is no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    ///
    /// `max_attempts` counts the first attempt; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Total attempts allowed, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before retry number `retry` (1-based)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.clamp(self.base_delay, self.max_delay)
    }

    /// Run `op` until it succeeds or the attempt ceiling is reached
    ///
    /// The waits block the calling task for their full duration. There is
    /// no cancellation: dropping the returned future is the only way to
    /// abandon a retry sequence.
    ///
    /// # Parameters
    ///
    /// - `label`: Operation name used in log lines
    /// - `op`: Produces one attempt per call
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: The first successful attempt's value
    /// - `Err(Error)`: The last attempt's error, once all attempts failed
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.delay_before_retry(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        operation = label,
                        attempts = attempt,
                        error = %e,
                        "Giving up after final attempt"
                    );
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1), Duration::from_secs(16))
    }
}
