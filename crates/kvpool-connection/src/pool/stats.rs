//! Pool statistics types

use deadpool::Status;
use serde::{Deserialize, Serialize};

/// Statistics about a connection pool's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Maximum number of connections the pool may hold
    max_size: usize,
    /// Total number of connections (idle + active)
    total: usize,
    /// Number of idle connections available in the pool
    idle: usize,
    /// Number of connections currently borrowed
    active: usize,
    /// Number of requests waiting for a connection
    waiting: usize,
}

impl PoolStats {
    /// Create new pool statistics
    pub fn new(max_size: usize, total: usize, idle: usize, active: usize, waiting: usize) -> Self {
        Self {
            max_size,
            total,
            idle,
            active,
            waiting,
        }
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the total number of connections
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the number of idle connections
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of active (borrowed) connections
    pub fn active(&self) -> usize {
        self.active
    }

    /// Get the number of waiting requests
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Calculate pool utilization as a fraction of the maximum size (0.0 to 1.0)
    ///
    /// Returns 0.0 for a pool with no capacity.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.active as f64 / self.max_size as f64
        }
    }

    /// Check if every connection the pool may hold is borrowed
    pub fn is_exhausted(&self) -> bool {
        self.max_size > 0 && self.active >= self.max_size
    }
}

impl From<Status> for PoolStats {
    fn from(status: Status) -> Self {
        let idle = status.available as usize;
        let total = status.size;
        Self::new(
            status.max_size,
            total,
            idle,
            total.saturating_sub(idle),
            status.waiting,
        )
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new(0, 0, 0, 0, 0)
    }
}
