//! Core traits for target clients
//!
//! Defined in core so the worker can be driven by any client; the HTTP
//! implementation lives in the vendors crate.

use crate::request::BulkBody;
use crate::response::{BulkResponse, QueryResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// Target Client Trait
// ============================================================================

/// Client for the indexing/query service under load
///
/// One handle is built up front and shared by every worker, so tests can
/// substitute a scripted double.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Client identifier used in logs (e.g. "opensearch")
    fn name(&self) -> &str;

    /// Send a batch write
    ///
    /// The returned items are aligned by index with `body.operations()`.
    async fn write_batch(
        &self,
        collection: &str,
        body: &BulkBody,
    ) -> Result<BulkResponse, TransportError>;

    /// Run a single query
    async fn query(&self, collection: &str, body: &Value) -> Result<QueryResponse, TransportError>;
}

/// Request-level failures: no per-item response is available
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP/network error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),
}

impl TransportError {
    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
