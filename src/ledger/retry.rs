//! Caller-side retry for transient transfer failures
//!
//! Exponential backoff with full jitter, capped attempts. Only conflicts and
//! timeouts are retried; financial-rule errors come back on the first try.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use super::LedgerError;

/// Bounded retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Backoff ceiling before jitter for the first retry
    pub base_delay: Duration,
    /// Upper bound for any single backoff
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff ceiling for the retry that follows attempt number `attempt` (0-based)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Full jitter: uniform in `[0, ceiling]`
    fn jittered(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        let millis = ceiling.as_millis() as u64;
        if millis == 0 {
            return ceiling;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.jittered(attempt);
                    attempt += 1;
                    tracing::warn!(
                        kind = ?e.kind(),
                        "transient transfer failure, retrying (attempt {}/{}) in {:?}",
                        attempt + 1,
                        max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
