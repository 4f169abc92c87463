//! Retry policy: decides enqueue backoff delays.

use std::time::Duration;

/// Retry policy for transient control-plane failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Total attempts, the first one included.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_attempts: 1,
        }
    }

    /// Calculate the delay after the given failed attempt.
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - attempt 1 failed: 200ms
    /// - attempt 2 failed: 400ms
    /// - attempt 3 failed: 800ms
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_attempts: 3,
        }
    }
}
