//! Retry with exponential backoff.
//!
//! `retry_with_backoff` runs an operation up to `max_retries + 1` times.
//! Every `Err` the operation yields is treated as retryable; callers that
//! must not retry some failure shape their operation so it returns `Ok` for
//! it (the relay returns `Ok` for any upstream HTTP response).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay to sleep once `failures` attempts have failed.
    pub fn delay_after(&self, failures: u32) -> Duration {
        calculate_backoff(
            failures,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Every attempt failed; carries the last error.
#[derive(Debug, Error)]
#[error("failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it succeeds or `policy.max_retries` retries have
/// failed. The operation receives the zero-based attempt number. Backoff
/// waits on the tokio timer, so other requests keep being served.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if attempt < policy.max_retries => {
                let delay = policy.delay_after(attempt + 1);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_retries = policy.max_retries,
                    delay = ?delay,
                    error = %error,
                    "Attempt failed, retrying"
                );
                metrics::record_retry(operation_name);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                tracing::error!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %error,
                    "Giving up after retries"
                );
                return Err(RetryExhausted {
                    attempts: attempt + 1,
                    last_error: error,
                });
            }
        }
    }
}
