//! Delay calculation between acquisition attempts

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often and how patiently to retry when a pool is exhausted.
///
/// The default is a fixed one second pause between up to five retries.
/// A multiplier above 1.0 turns the fixed pause into exponential backoff,
/// capped at `max_delay`.
///
/// # Example
///
/// ```
/// use kvpool_connection::RetryPolicy;
/// use std::time::Duration;
///
/// let fixed = RetryPolicy::default();
/// assert_eq!(fixed.delay_for(0), Duration::from_secs(1));
/// assert_eq!(fixed.delay_for(4), Duration::from_secs(1));
///
/// let backoff = RetryPolicy::new(5, Duration::from_millis(100))
///     .with_backoff(2.0, Duration::from_millis(300));
/// assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
/// assert_eq!(backoff.delay_for(3), Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,
    /// Delay in milliseconds before the first retry
    initial_delay_ms: u64,
    /// Cap in milliseconds for growing delays
    max_delay_ms: u64,
    /// Growth factor per retry (1.0 = fixed delay)
    multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy with a fixed delay between retries
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        Self {
            max_retries,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            multiplier: 1.0,
        }
    }

    /// A policy that gives up after the first attempt
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Grow the delay by `multiplier` per retry, up to `max_delay`
    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.multiplier = multiplier.max(1.0);
        self.max_delay_ms = (max_delay.as_millis() as u64).max(self.initial_delay_ms);
        self
    }

    /// Calculate the pause before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64) * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped_ms)
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the first retry
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Cap for growing delays
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Growth factor per retry
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for RetryPolicy {
    /// Five retries, one second apart
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}
