//! Pool configuration types

use std::time::Duration;

use kvpool_core::{KvError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a source's connection pool
///
/// Controls pool sizing, timeouts and idle eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections, idle and borrowed together
    max_total: usize,
    /// Maximum number of idle connections kept for reuse
    max_idle: usize,
    /// Upper bound in milliseconds for one acquisition, retries included
    max_wait_ms: u64,
    /// Interval in milliseconds between idle eviction sweeps
    eviction_interval_ms: u64,
    /// Idle time in milliseconds after which a connection may be evicted
    min_evictable_idle_ms: u64,
    /// Connect and read timeout in milliseconds
    timeout_ms: u64,
    /// Whether idle connections are pinged before being handed out
    validate_on_borrow: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with the given total and idle limits
    ///
    /// # Panics
    ///
    /// Panics if `max_total` is 0 or if `max_idle > max_total`.
    pub fn new(max_total: usize, max_idle: usize) -> Self {
        assert!(
            max_total > 0,
            "max_total must be greater than 0, got {}",
            max_total
        );
        assert!(
            max_idle <= max_total,
            "max_idle ({}) cannot exceed max_total ({})",
            max_idle,
            max_total
        );

        Self {
            max_total,
            max_idle,
            max_wait_ms: 1_800_000,        // 30 minutes
            eviction_interval_ms: 180_000, // 3 minutes
            min_evictable_idle_ms: 60_000, // 1 minute
            timeout_ms: 180_000,           // 3 minutes
            validate_on_borrow: true,
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    /// Set the maximum number of idle connections
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set the acquisition upper bound in milliseconds
    pub fn with_max_wait_ms(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    /// Set the idle eviction interval in milliseconds
    pub fn with_eviction_interval_ms(mut self, interval_ms: u64) -> Self {
        self.eviction_interval_ms = interval_ms;
        self
    }

    /// Set the idle time after which connections may be evicted, in milliseconds
    pub fn with_min_evictable_idle_ms(mut self, idle_ms: u64) -> Self {
        self.min_evictable_idle_ms = idle_ms;
        self
    }

    /// Set the connect and read timeout in milliseconds
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable validation of idle connections before reuse
    pub fn with_validate_on_borrow(mut self, validate: bool) -> Self {
        self.validate_on_borrow = validate;
        self
    }

    /// Check the configuration for values the pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_total == 0 {
            return Err(KvError::Configuration(
                "max_total must be greater than 0".to_string(),
            ));
        }
        if self.max_idle > self.max_total {
            return Err(KvError::Configuration(format!(
                "max_idle ({}) cannot exceed max_total ({})",
                self.max_idle, self.max_total
            )));
        }
        if self.eviction_interval_ms == 0 {
            return Err(KvError::Configuration(
                "eviction interval must be greater than 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(KvError::Configuration(
                "timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the maximum number of connections
    pub fn max_total(&self) -> usize {
        self.max_total
    }

    /// Get the maximum number of idle connections
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    /// Get the acquisition upper bound
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Get the idle eviction interval
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }

    /// Get the idle time after which connections may be evicted
    pub fn min_evictable_idle(&self) -> Duration {
        Duration::from_millis(self.min_evictable_idle_ms)
    }

    /// Get the connect and read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether idle connections are validated before reuse
    pub fn validate_on_borrow(&self) -> bool {
        self.validate_on_borrow
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - max_total: 1024
    /// - max_idle: 10
    /// - max_wait: 30 minutes
    /// - eviction_interval: 3 minutes
    /// - min_evictable_idle: 1 minute
    /// - timeout: 3 minutes
    /// - validate_on_borrow: true
    fn default() -> Self {
        Self::new(1024, 10)
    }
}
