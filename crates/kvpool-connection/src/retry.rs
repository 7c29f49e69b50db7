//! Retry behaviour for acquiring pooled connections
//!
//! When a pool has no free slot, acquisition retries a bounded number of
//! times with a delay between attempts. Callers may bound the whole
//! acquisition with a deadline or abort it through a cancellation token.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use kvpool_connection::retry::{AcquireOptions, RetryPolicy};
//!
//! let options = AcquireOptions::new()
//!     .with_retry(RetryPolicy::new(3, Duration::from_millis(250)))
//!     .with_timeout(Duration::from_secs(2));
//!
//! assert_eq!(options.retry().map(|r| r.max_attempts()), Some(4));
//! ```

mod options;
mod policy;

#[cfg(test)]
mod tests;

pub use options::AcquireOptions;
pub use policy::RetryPolicy;
