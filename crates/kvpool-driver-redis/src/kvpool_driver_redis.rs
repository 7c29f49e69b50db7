//! Redis driver for kvpool
//!
//! Opens multiplexed async connections with the `redis` crate and exposes
//! them through the `CacheConnection` trait so they can be pooled.

mod driver;
#[cfg(test)]
mod driver_tests;

pub use driver::*;
