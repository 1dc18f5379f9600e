//! Error types for shardcache
//!
//! Provides a unified error type for all operations. A lookup miss is not an
//! error: it is reported as `Ok(None)`.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for shardcache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt format: {0}")]
    CorruptFormat(String),

    #[error("Length {len} does not fit the configured length field (max {max})")]
    ValueTooLarge { len: u64, max: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Residency Errors
    // -------------------------------------------------------------------------
    #[error("Store content not resident: {0}")]
    NotResident(String),

    // -------------------------------------------------------------------------
    // Internal Errors
    // -------------------------------------------------------------------------
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
