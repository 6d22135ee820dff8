//! Bounded retry loops shared by the external-service adapters.
//!
//! Each adapter owns a [`RetryPolicy`] and classifies its own failures through
//! [`Retryable`]; permanent failures short-circuit the loop immediately.

use std::{fmt::Display, future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;
use tracing::{error, warn};

/// Failure that knows whether repeating the call can succeed.
pub trait Retryable {
    /// `true` for transient failures (network, rate limit, server errors).
    fn is_retryable(&self) -> bool;

    /// Delay requested by the remote service, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Shape of the delay between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `step * attempt`, i.e. 1s, 2s, 3s... for a one second step.
    Linear {
        /// Delay added after every failed attempt.
        step: Duration,
    },
    /// `base * 2^(attempt - 1)` plus a uniform jitter in `[0, max_jitter)`.
    Exponential {
        /// Delay after the first failed attempt.
        base: Duration,
        /// Upper bound of the random jitter added to each delay.
        max_jitter: Duration,
    },
}

/// Attempt budget plus backoff shape for one external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay strategy between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed attempt count with linearly increasing delays.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { step },
        }
    }

    /// Fixed attempt count with doubling delays and random jitter.
    pub fn exponential(max_attempts: u32, base: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, max_jitter },
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Exponential { base, max_jitter } => {
                let exponent = (attempt - 1).min(16);
                let delay = base.saturating_mul(1u32 << exponent);
                if max_jitter.is_zero() {
                    delay
                } else {
                    let fraction: f64 = rand::rng().random();
                    delay + max_jitter.mul_f64(fraction)
                }
            }
        }
    }

    /// Run `call` until it succeeds, fails permanently, or the budget is spent.
    pub async fn run<F, Fut, T, E>(&self, operation: &'static str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(operation, attempt, error = %err, "permanent failure; not retrying");
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(operation, attempts = attempt, error = %err, "retries exhausted");
                return Err(err);
            }

            let computed = self.delay_for(attempt);
            let delay = err
                .retry_after()
                .map_or(computed, |hint| hint.max(computed));
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure; retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
