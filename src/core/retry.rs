//! Retry utilities for transient delivery errors.

use crate::core::{ExporterError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the first one fails
    pub max_retries: u32,
    /// Fixed pause between two attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Execute an operation, retrying recoverable errors after a fixed delay.
///
/// Non-recoverable errors are returned as soon as they occur. When every
/// attempt failed with a recoverable error the result is
/// [`ExporterError::RetriesExhausted`].
pub async fn retry_with_config<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if !error.is_recoverable() => return Err(error),
            Err(error) if attempt >= config.max_attempts() => {
                tracing::error!("Operation failed after {} attempts: {}", attempt, error);
                return Err(ExporterError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            },
            Err(error) => {
                tracing::warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    error,
                    config.delay
                );
                sleep(config.delay).await;
            },
        }
    }
}
