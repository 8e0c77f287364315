//! Retry policy for transient status-fetch errors: decides backoff delays.

use std::time::Duration;

/// Backoff for re-reading a status after a transient error.
///
/// Only the read is retried. A terminal status is never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single delay.
    pub max_delay: Duration,

    /// Retries per fetch before the error is surfaced. 0 disables retrying.
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Surface every fetch error immediately.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate delay for the next retry.
    ///
    /// `attempts` is 1-indexed: delay = base_delay * multiplier^(attempts - 1),
    /// capped at `max_delay`.
    ///
    /// With base_delay=2s, multiplier=2.0:
    /// - attempt 1: 2s
    /// - attempt 2: 4s
    /// - attempt 3: 8s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}
