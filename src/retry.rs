//! Retry logic with exponential backoff
//!
//! Used only by [`Syncer::request_with_retry`](crate::Syncer::request_with_retry).
//! Outcomes decide for themselves whether another attempt is worthwhile through
//! [`IsRetryable`]; delays grow exponentially with optional jitter to prevent
//! thundering herd.
//!
//! # Example
//!
//! ```no_run
//! use fetch_syncer::retry::{IsRetryable, with_retry};
//! use fetch_syncer::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum Outcome {
//!     Busy,
//!     Done,
//! }
//!
//! impl IsRetryable for Outcome {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Outcome::Busy)
//!     }
//! }
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let outcome = with_retry(&config, None, || async { Outcome::Done }).await;
//! # let _ = outcome;
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use crate::types::RequestResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for outcomes that can be classified as worth retrying or not
///
/// Transient failures (timeouts, connection errors, rate limiting, server
/// errors) should return `true`. Final answers should return `false`.
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RequestResult {
    fn is_retryable(&self) -> bool {
        match self.code {
            // Never attempted: nothing a retry would change
            None => false,
            // Cancelled (timeout or caller token) or transport failure
            Some(code) if code <= 0 => true,
            // Rate limited
            Some(429) => true,
            Some(code) => (500..600).contains(&code),
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => !e.is_aborted(),
            // Hook failures, panics, codec and config errors are permanent
            _ => false,
        }
    }
}

impl<T, E> IsRetryable for Result<T, E>
where
    T: IsRetryable,
    E: IsRetryable,
{
    fn is_retryable(&self) -> bool {
        match self {
            Ok(value) => value.is_retryable(),
            Err(e) => e.is_retryable(),
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `cancel` - Stops retrying (including mid-delay) once cancelled
/// * `operation` - Async closure producing an outcome that implements [`IsRetryable`]
///
/// # Returns
///
/// The first non-retryable outcome, or the last outcome once attempts are exhausted
/// or `cancel` fires.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
    mut operation: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: IsRetryable,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        let outcome = operation().await;

        if !outcome.is_retryable() {
            if attempt > 0 {
                tracing::info!(attempts = attempt + 1, "Operation settled after retry");
            }
            return outcome;
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!(attempts = attempt + 1, "Retry stopped by cancellation");
            return outcome;
        }

        if attempt >= config.max_attempts {
            tracing::warn!(
                attempts = attempt + 1,
                "Operation failed after all retry attempts exhausted"
            );
            return outcome;
        }

        attempt += 1;

        // Calculate jittered delay
        let jittered_delay = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };

        tracing::warn!(
            attempt = attempt,
            max_attempts = config.max_attempts,
            delay_ms = jittered_delay.as_millis() as u64,
            "Operation failed, retrying"
        );

        match cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => return outcome,
                    _ = tokio::time::sleep(jittered_delay) => {}
                }
            }
            None => tokio::time::sleep(jittered_delay).await,
        }

        // Calculate next delay with exponential backoff
        let next_delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
        delay = next_delay.min(config.max_delay);
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
