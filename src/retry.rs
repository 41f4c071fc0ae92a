//! Retry logic with exponential backoff
//!
//! Transport-level retries for calls to external services. This is distinct
//! from the structured task retry loop: it repeats the *same* request when the
//! transport fails transiently, and never looks at what the model said.
//!
//! # Example
//!
//! ```no_run
//! use comment_moderator::retry::{IsRetryable, with_retry};
//! use comment_moderator::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, 2, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::GenerationError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connection refused, timeouts, server busy) should return `true`.
/// Permanent failures (bad request, malformed response) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Connection(_) => true,
            GenerationError::Timeout(_) => true,
            // Model still loading, overloaded, or rate limited
            GenerationError::Status { status, .. } => *status == 429 || *status >= 500,
            GenerationError::Http(_) => false,
            GenerationError::ResponseParsing(_) => false,
            GenerationError::Model(_) => false,
        }
    }
}

/// Execute an async operation, retrying transient failures with exponential backoff
///
/// # Arguments
///
/// * `config` - Backoff configuration (delays, multiplier, jitter)
/// * `max_retries` - Retries after the first attempt (0 = single attempt)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    max_retries: u32,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis(),
                    "transport failure, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt + 1,
                        "transport retries exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "non-retryable transport error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
