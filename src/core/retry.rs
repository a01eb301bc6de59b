//! Retry logic with exponential backoff
//!
//! Used for the scanner download. The default is a single attempt; extra
//! attempts are opt-in through `scanner.downloadAttempts`.

use crate::core::error::ScanError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Options for retry behavior
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Retry manager for executing operations with exponential backoff
///
/// Only errors reporting [`ScanError::is_retryable`] are retried.
///
/// # Examples
///
/// ```no_run
/// use mend_image_scan::core::{RetryManager, RetryOptions, ScanError};
///
/// # async fn example() -> Result<(), ScanError> {
/// let manager = RetryManager::new(RetryOptions::with_attempts(3));
///
/// let bytes = manager
///     .retry(|| async { Ok::<_, ScanError>(vec![0u8; 4]) })
///     .await?;
/// assert_eq!(bytes.len(), 4);
/// # Ok(())
/// # }
/// ```
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Execute the given async operation with retry logic
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T, ScanError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScanError>>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut delay = self.options.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) if !error.is_retryable() || attempt >= max_attempts => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(attempt, max_attempts, %error, "attempt failed, retrying");

                    sleep(delay).await;
                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
