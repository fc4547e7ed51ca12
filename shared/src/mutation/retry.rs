//! Bounded retry for remote mutations

use std::time::Duration;

use serde_json::Value;

use super::{MutationError, MutationExecutor};

/// Default number of attempts (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay unit, multiplied by the attempt number
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Linear backoff: after failed attempt `n` wait `base_delay * n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based), `None` after the last one
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.base_delay * attempt)
        }
    }
}

/// Successful result plus the attempt it took
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// All attempts failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: MutationError,
}

/// Run `query` until it succeeds or the policy runs out of attempts
///
/// Every [`MutationError`] is treated as transient. Retries are not
/// cancellable once started.
pub async fn execute_with_retry(
    executor: &dyn MutationExecutor,
    policy: &RetryPolicy,
    query: &str,
    variables: Value,
) -> Result<Retried<Value>, RetryExhausted> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match executor.execute(query, variables.clone()).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Mutation succeeded after retry");
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "Mutation attempt failed");
                match policy.delay_for(attempt) {
                    Some(delay) => {
                        tracing::debug!(delay_ms = delay.as_millis() as u64, "Retrying...");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                }
            }
        }
    }
}
