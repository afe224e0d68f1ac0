//! Error types for the cache crate
//!
//! Reads and writes never fail: a cache is an optimization, so the only
//! fallible surfaces are configuration validation and value serialization.

use thiserror::Error;

/// Main error type for cache configuration and value conversion
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid tier or manager configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Value could not be converted to or from its stored JSON form
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
