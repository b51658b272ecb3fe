//! Retry with exponential backoff, shared by the job fetcher and the model client.
//!
//! Only errors that report themselves as transient are retried. A permanent
//! error ends the loop on the attempt that produced it.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Upper bound on any configured attempt budget.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Classifies an error as worth another attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Delay schedule between attempts: `base_delay * multiplier^(retry - 1)`, capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (1-based: the wait before the second attempt is `retry = 1`).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        // Large exponents overflow Duration; anything that large is over the cap anyway.
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn with_attempts(self, max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            backoff: self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// A successful value together with the attempt it took to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// The error of the final attempt, and how many attempts were made.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

/// Runs `op` until it succeeds, fails permanently, or the attempt budget runs out.
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<Retried<T>, Exhausted<E>>
where
    E: Transient + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                })
            }
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let delay = policy.backoff.delay_for(attempt);
                warn!(
                    "{label} attempt {attempt}/{max_attempts} failed ({error}), retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(Exhausted {
                    error,
                    attempts: attempt,
                })
            }
        }
    }
}
