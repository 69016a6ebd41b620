use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Whether a failed call is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    /// Wait after the given (1-based) failed attempt: `2^attempt * base`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: Display> {
    #[error("service unavailable, retried {attempts} times: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    #[error("{0}")]
    Aborted(E),
}

/// Calls `f` until it succeeds, a permanent failure occurs, or
/// `max_attempts` is reached. Transient failures are followed by an
/// exponential backoff; there is no wait after the last attempt.
pub async fn retry_classified<F, Fut, T, E, C>(
    config: &RetryConfig,
    classify: C,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> FailureClass,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if classify(&err) == FailureClass::Permanent {
                    tracing::warn!(attempt, error = %err, "Permanent failure, not retrying");
                    return Err(RetryError::Aborted(err));
                }

                if attempt >= max_attempts {
                    tracing::error!(attempts = attempt, error = %err, "Retries exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }

                let wait = config.backoff_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
