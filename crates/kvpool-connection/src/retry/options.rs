//! Per-call acquisition options

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::RetryPolicy;

/// Options for a single acquisition
///
/// Anything left unset falls back to the registry's defaults: its retry
/// policy, and the source's `max_wait` as the only deadline.
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    retry: Option<RetryPolicy>,
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl AcquireOptions {
    /// Options that use the registry defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Give up once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Give up once `timeout` has elapsed from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Abort the acquisition when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The retry policy override, if any
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// Whether the caller already cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}
