//! kvpool core - shared abstractions for pooled cache connections
//!
//! This crate provides the types every other kvpool crate depends on:
//!
//! - `CacheConnection` - Trait for a single connection to a key-value cache
//! - `ConnectionFactory` - Trait for drivers that open new connections
//! - `Endpoint` - Where and how to connect
//! - `ConfigSource` - Key/value configuration with typed getters and defaults
//! - `KvError` / `Result` - The error type shared by all library crates

mod connection;
mod error;
pub mod settings;

pub use connection::*;
pub use error::*;
pub use settings::{ConfigSource, EnvConfig, LayeredConfig, MapConfig, TomlConfig};
