//! Exponential backoff for directory calls.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::DirectoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never less than 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Same attempt ceiling, no sleeping. Used by tests and dry tooling.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Sleep before attempt `attempt + 1`, given `attempt` (1-based) just failed:
    /// `min(base * 2^(attempt-1), max)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt ceiling is reached. `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, DirectoryError>
    where
        F: FnMut(u32) -> Result<T, DirectoryError>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt: u32 = 1;
        loop {
            match op(attempt) {
                Ok(v) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "directory call succeeded after retries");
                    }
                    return Ok(v);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max => {
                    warn!(operation, attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(DirectoryError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    debug!(
                        operation,
                        attempt,
                        max_attempts = max,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient directory error; backing off"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
