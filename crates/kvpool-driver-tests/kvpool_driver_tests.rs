//! kvpool integration tests against a real Redis server
//!
//! A Redis container is started on first use with testcontainers-rs and
//! shared by every test in the process. The tests need a Docker daemon and
//! are ignored by default.
//!
//! # Usage
//!
//! ```bash
//! # Run with automatically managed containers
//! cargo test -p kvpool-driver-tests -- --ignored
//!
//! # Use an already running server instead
//! export KVPOOL_TEST_MANUAL_CONTAINERS=1
//! export KVPOOL_TEST_REDIS_PORT=6379
//! cargo test -p kvpool-driver-tests -- --ignored
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fixtures;
pub mod test_containers;

#[cfg(test)]
pub mod redis_tests;

#[cfg(test)]
pub mod registry_tests;
