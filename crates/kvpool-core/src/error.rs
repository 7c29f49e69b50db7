//! Error types for kvpool

use thiserror::Error;

/// Core error type for kvpool operations
#[derive(Error, Debug)]
pub enum KvError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Pool exhausted for source '{source_name}' after {attempts} attempts")]
    PoolExhausted { source_name: String, attempts: u32 },

    #[error("Acquire failed for source '{source_name}': {reason}")]
    AcquireFailed { source_name: String, reason: String },

    #[error("Connection belongs to source '{actual}', not '{expected}'")]
    SourceMismatch { expected: String, actual: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Closed: {0}")]
    Closed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl KvError {
    /// Whether the error means the physical connection can no longer be trusted.
    ///
    /// Command errors reported by the server (wrong type, unknown command) leave
    /// the connection usable; transport, timeout and auth failures do not.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            KvError::Connection(_)
                | KvError::Authentication(_)
                | KvError::Timeout(_)
                | KvError::Closed(_)
                | KvError::Io(_)
        )
    }
}

/// Result type alias for kvpool operations
pub type Result<T> = std::result::Result<T, KvError>;
