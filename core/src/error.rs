//! Error types for osbench-core

use thiserror::Error;

use crate::config::ConfigError;

/// Category of a [`BenchError`]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BenchErrorKind {
    /// Invalid or missing configuration
    #[error("configuration error")]
    Config,
    /// Worker pool supervision failure
    #[error("runner error")]
    Runner,
    /// Document/query source failure
    #[error("source error")]
    Source,
    /// A channel or task went away during shutdown
    #[error("shutdown")]
    Shutdown,
}

/// Core error type
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// Error category
    pub kind: BenchErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Invalid configuration value
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Config, message)
    }

    /// A builder was finalized without a required field
    pub fn missing_config(field: &str) -> Self {
        Self::config(format!("missing required field: {field}"))
    }

    /// Worker pool supervision failure
    pub fn runner(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Runner, message)
    }

    /// Source could not be read
    pub fn data_source(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Source, message)
    }

    /// Results channel closed before delivery
    pub fn shutdown() -> Self {
        Self::new(BenchErrorKind::Shutdown, "channel closed during shutdown")
    }
}

impl From<ConfigError> for BenchError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
