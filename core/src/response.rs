//! Target-service response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one item of a batch write, aligned by index with the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    /// HTTP-like status reported for the item
    pub status: u16,
    /// Error annotation, present only when the item was rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl BulkItemResult {
    /// Accepted item
    pub fn ok(status: u16) -> Self {
        Self {
            status,
            error: None,
        }
    }

    /// Rejected item with an error annotation
    pub fn failed(status: u16, error: Value) -> Self {
        Self {
            status,
            error: Some(error),
        }
    }

    /// Whether the item carries an error annotation
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Response of a batch write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Server-side processing time in milliseconds
    pub took: u64,
    /// Whether any item failed
    pub errors: bool,
    /// Per-item results in request order
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    /// Response where all `n` items were accepted
    pub fn success(n: usize) -> Self {
        Self {
            took: 0,
            errors: false,
            items: vec![BulkItemResult::ok(201); n],
        }
    }

    /// Indices of items carrying an error annotation
    pub fn failed_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_error())
            .map(|(i, _)| i)
            .collect()
    }

    /// First error annotation, for logging
    pub fn first_error(&self) -> Option<&Value> {
        self.items.iter().find_map(|item| item.error.as_ref())
    }
}

/// Response of a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Server-side processing time in milliseconds, when reported
    #[serde(default)]
    pub took: Option<u64>,
    /// Number of hits returned
    #[serde(default)]
    pub hits: usize,
}

impl QueryResponse {
    /// Response with the given server time and hit count
    pub fn new(took: Option<u64>, hits: usize) -> Self {
        Self { took, hits }
    }
}
