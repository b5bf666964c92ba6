//! Source errors

use std::path::PathBuf;

use thiserror::Error;

/// Failure to open or read a source
#[derive(Debug, Error)]
pub enum SourceError {
    /// File could not be opened
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Path exists but is not a regular file
    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    /// A cycled source produced no items in a full pass
    #[error("source {0} yielded no items")]
    Empty(PathBuf),
}

/// Result alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;
