//! Exponential backoff for transient collaborator errors
//!
//! The cloud API collaborator rate-limits and occasionally drops
//! connections; its calls are wrapped in a bounded retry with exponential
//! backoff and jitter. Unlike the convergence poller, which waits for remote
//! state, this retries the same call - and only for errors its own type
//! classifies as transient.

use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// Classifies an error as retryable or not.
///
/// Implemented by collaborator error types; fatal errors surface after a
/// single attempt.
pub trait Transient {
    /// Whether retrying the same call can reasonably succeed
    fn is_transient(&self) -> bool;
}

/// Configuration for retried operations
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = unbounded)
    pub max_attempts: u32,
    /// Initial delay between attempts
    pub initial_delay: Duration,
    /// Cap on the delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// The cloud collaborator's published backoff policy: base 1s,
    /// multiplier 2, capped at 10s, bounded attempts.
    pub fn cloud_defaults() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

/// Execute an async operation, retrying transient failures with exponential
/// backoff and jitter.
///
/// Non-transient errors are returned immediately. Transient errors are
/// retried until success or until `max_attempts` is exhausted, sleeping a
/// jittered (0.5x-1.5x) multiple of the current delay between attempts.
pub async fn retry_transient<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => {
                error!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "operation failed with non-retryable error"
                );
                return Err(e);
            }
            Err(e) => {
                if config.max_attempts > 0 && attempt >= config.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt,
                        error = %e,
                        "operation failed after max retries"
                    );
                    return Err(e);
                }

                // Jitter: 0.5x to 1.5x of the delay
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    delay_ms = jittered_delay.as_millis() as u64,
                    "transient failure, retrying"
                );

                tokio::time::sleep(jittered_delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
