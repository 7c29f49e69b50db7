//! kvpool connection - named connection pools for a key-value cache
//!
//! This crate owns the pool registry: one `deadpool` pool per configured
//! source, retrying acquisition with deadlines and cancellation, password
//! authentication of borrowed connections, release with discard-on-error,
//! idle eviction and shutdown.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kvpool_connection::Registry;
//! use kvpool_core::MapConfig;
//! use kvpool_driver_redis::RedisConnector;
//!
//! let config = MapConfig::new().with("redis.names", "main,cache2");
//! let registry = Arc::new(Registry::initialize(&config, Arc::new(RedisConnector::new()))?);
//!
//! let conn = registry.acquire("main").await?;
//! conn.command("SET", &["greeting", "hello"]).await?;
//! registry.release("main", Some(conn)).await?;
//!
//! registry.shutdown();
//! ```

pub mod pool;
mod registry;
pub mod retry;
mod source;

#[cfg(test)]
mod test_support;

pub use pool::{PoolConfig, PoolStats, PooledConnection};
pub use registry::{DEFAULT_SOURCE_NAMES, Registry, RegistryState, SOURCE_NAMES_KEY, parse_source_names};
pub use retry::{AcquireOptions, RetryPolicy};
pub use source::{Source, SourceConfig};
