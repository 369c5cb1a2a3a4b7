//! Exponential backoff retry for outbound calls.
//!
//! Every GitHub API call and every free-text model completion goes through an
//! [`Executor`]. The defaults are:
//!
//! - 3 attempts in total
//! - 1s, then 2s between attempts (`base_delay * 2^(attempt-1)`)
//! - no delay after the final attempt
//!
//! Failures are not classified here: a validation error is retried exactly
//! like a server error. Callers that want a different policy must not route
//! through the executor.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::delay::Delay;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Maximum delay between attempts (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default retry configuration for outbound calls.
    ///
    /// - 3 attempts with 1s, 2s delays between them
    /// - Total max wait: 3 seconds
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(4), // Won't hit this with 3 attempts
        backoff_multiplier: 2.0,
    };

    /// Backoff schedule for reconnecting to the event transport.
    ///
    /// `max_attempts` is not consulted: the listener reconnects forever.
    /// - 1s base, 30s cap
    pub const RECONNECT: Self = Self {
        max_attempts: u32::MAX,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    /// Creates a new retry configuration.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay after the given failed attempt (1-indexed).
    ///
    /// The delay grows exponentially: `base_delay * backoff_multiplier^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_multiplier.powi(exponent);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all delays of a fully failing run.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Computes the total maximum wait time for all retries.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Returned when every attempt of an operation failed.
///
/// Carries the error from the last attempt unchanged.
#[derive(Debug)]
pub struct ExhaustedRetries<E> {
    /// The label the operation was executed under.
    pub label: String,
    /// Number of attempts made (including the initial attempt).
    pub attempts: u32,
    /// The error from the final attempt.
    pub last_error: E,
}

impl<E> ExhaustedRetries<E> {
    /// Returns the error from the final attempt.
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

impl<E: fmt::Display> fmt::Display for ExhaustedRetries<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempts: {}",
            self.label, self.attempts, self.last_error
        )
    }
}

impl<E: Error + 'static> Error for ExhaustedRetries<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.last_error)
    }
}

/// The resilient operation executor.
///
/// Cloning is cheap; clones share the delay function.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: RetryConfig,
    delay: Delay,
}

impl Executor {
    pub fn new(config: RetryConfig, delay: Delay) -> Self {
        Self { config, delay }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn delay(&self) -> &Delay {
        &self.delay
    }

    /// Executes an async operation with retry logic.
    ///
    /// `operation` is called until it succeeds or `max_attempts` calls have
    /// failed. Between failures the configured delay function is awaited with
    /// the backoff for that attempt. The success value is returned unchanged.
    pub async fn execute<T, E, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
    ) -> Result<T, ExhaustedRetries<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    error!(
                        operation = label,
                        attempts = attempt,
                        error = %e,
                        "Operation failed, retries exhausted"
                    );
                    return Err(ExhaustedRetries {
                        label: label.to_string(),
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    self.delay.wait(delay).await;
                }
            }
        }
    }
}
