//! Retry policy with exponential backoff
//!
//! Bounded retry strategy:
//! - Max retries: 3 (4 attempts total)
//! - Delay before retry i (0-based): base · 2^i plus uniform jitter in [0, 200ms]
//! - Only transport, server and timeout errors are retried

use crate::errors::{Result, ToolError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Maximum number of retries after the first attempt
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (1 second)
pub const BASE_DELAY_MS: u64 = 1000;

/// Upper bound of the random jitter added to each delay
pub const MAX_JITTER_MS: u64 = 200;

/// Result of a retried operation plus the number of attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Retry policy with exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt
    max_retries: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Jitter upper bound in milliseconds (0 disables jitter)
    max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Create retry policy with default settings
    pub fn new() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_jitter_ms: MAX_JITTER_MS,
        }
    }

    /// Create retry policy with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_jitter_ms: MAX_JITTER_MS,
        }
    }

    /// Set jitter upper bound
    pub fn with_jitter(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    /// Execute operation with retry logic
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_notify(operation, |_, _, _| {}).await
    }

    /// Execute operation with retry logic, calling `on_retry(attempt, error, delay)`
    /// before each backoff sleep
    pub async fn execute_with_notify<F, Fut, T, N>(&self, mut operation: F, mut on_retry: N) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        N: FnMut(u32, &ToolError, Duration),
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt > self.max_retries {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.delay_for(attempt - 1);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after failure"
            );
            on_retry(attempt, &error, delay);
            sleep(delay).await;
        }
    }

    /// Backoff without jitter before retry `retry` (0-based)
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Backoff with jitter before retry `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter = if self.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        } else {
            0
        };
        self.base_delay_for(retry) + Duration::from_millis(jitter)
    }

    /// Largest possible sum of all backoff delays
    pub fn max_total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|retry| self.base_delay_for(retry) + Duration::from_millis(self.max_jitter_ms))
            .sum()
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}
