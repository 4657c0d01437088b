//! Error types for Replay.

use thiserror::Error;

/// Main error type for Replay operations.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline still active: {0}")]
    PipelineActive(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
