//! Per-source connection pools
//!
//! Pools are `deadpool` managed pools. This module provides the pool
//! configuration, the `deadpool` manager that opens and validates
//! connections, the borrowed connection handle and pool statistics.

mod config;
mod connection;
mod manager;
mod stats;


pub use config::PoolConfig;
pub use connection::PooledConnection;
pub use manager::{PoolEntry, SourceManager, SourcePool};
pub use stats::PoolStats;
