//! Error types for Duskblade.

use thiserror::Error;

/// Top-level error type for Duskblade operations.
#[derive(Debug, Error)]
pub enum DuskbladeError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for Duskblade operations.
pub type DuskbladeResult<T> = Result<T, DuskbladeError>;
