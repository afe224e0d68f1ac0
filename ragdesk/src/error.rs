//! Error types for providers and configuration
//!
//! Provider errors never reach the caller of the answer pipeline: the
//! retrieval orchestrator folds them into a failed [`RetrievalResult`] and the
//! pipeline turns generation failures into a fallback answer.
//!
//! [`RetrievalResult`]: crate::retrieval::RetrievalResult

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors a retrieval or generation provider may raise
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The call did not finish within its budget
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Any failure reported by the backing service
    #[error("Backend error: {0}")]
    Backend(String),

    /// Provider is unavailable (no data source, missing command, ...)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Coarse classification carried by failed retrieval results
    pub fn kind(&self) -> RetrievalErrorKind {
        match self {
            ProviderError::Timeout { .. } => RetrievalErrorKind::Timeout,
            ProviderError::NotConfigured(_) => RetrievalErrorKind::NotConfigured,
            _ => RetrievalErrorKind::ProviderError,
        }
    }
}

/// Why a provider call produced no items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalErrorKind {
    Timeout,
    ProviderError,
    NotConfigured,
}

impl RetrievalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalErrorKind::Timeout => "timeout",
            RetrievalErrorKind::ProviderError => "provider_error",
            RetrievalErrorKind::NotConfigured => "not_configured",
        }
    }
}

impl fmt::Display for RetrievalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed error recorded on a failed retrieval result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalError {
    pub kind: RetrievalErrorKind,
    pub detail: String,
}

impl From<&ProviderError> for RetrievalError {
    fn from(e: &ProviderError) -> Self {
        Self {
            kind: e.kind(),
            detail: e.to_string(),
        }
    }
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ragdesk_cache::CacheError> for ConfigError {
    fn from(e: ragdesk_cache::CacheError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}
