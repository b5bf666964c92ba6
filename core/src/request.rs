//! Work unit and payload types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One item pulled from a source: an identifier and its JSON content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Document or query identifier
    pub id: String,
    /// Document body or query body
    pub content: Value,
}

impl SourceItem {
    /// Create a new source item
    pub fn new(id: impl Into<String>, content: Value) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }
}

/// One action+document pair of a bulk write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    /// Action metadata line, e.g. `{"index":{"_index":"docs","_id":"7"}}`
    pub action: Value,
    /// Document source line
    pub document: Value,
}

impl BulkOperation {
    /// Index action for `item` into `collection`
    pub fn index(collection: &str, item: SourceItem) -> Self {
        Self {
            action: json!({ "index": { "_index": collection, "_id": item.id } }),
            document: item.content,
        }
    }
}

/// Body of a batch write, ordered exactly as sent
///
/// Response items are matched to operations by position, so the order here is
/// the order the target sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkBody {
    operations: Vec<BulkOperation>,
}

impl BulkBody {
    /// Wrap a list of operations
    pub fn new(operations: Vec<BulkOperation>) -> Self {
        Self { operations }
    }

    /// Number of underlying items
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch carries no items
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in send order
    pub fn operations(&self) -> &[BulkOperation] {
        &self.operations
    }

    /// Sub-batch holding the operations at `indices`, in the given order
    ///
    /// Indices past the end are ignored.
    pub fn select(&self, indices: &[usize]) -> BulkBody {
        let operations = indices
            .iter()
            .filter_map(|&i| self.operations.get(i).cloned())
            .collect();
        BulkBody { operations }
    }

    /// Newline-delimited JSON rendering with a trailing newline
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for op in &self.operations {
            out.push_str(&serde_json::to_string(&op.action)?);
            out.push('\n');
            out.push_str(&serde_json::to_string(&op.document)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// What a work unit asks the target to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Batch write covering several items
    Bulk(BulkBody),
    /// A single query
    Query {
        /// Query identifier from the source
        id: String,
        /// Query DSL body
        body: Value,
    },
}

/// One dequeue-able unit of work
///
/// Created once by the producer and consumed exactly once by one worker. It is
/// never put back on the shared queue; retries happen inside the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Request content
    pub payload: Payload,
    /// Number of underlying items covered by the payload
    pub unit_count: usize,
    /// Retry attempts already spent on this unit
    pub retry_count: u32,
}

impl WorkUnit {
    /// Bulk unit covering every operation in `body`
    pub fn bulk(body: BulkBody) -> Self {
        let unit_count = body.len();
        Self {
            payload: Payload::Bulk(body),
            unit_count,
            retry_count: 0,
        }
    }

    /// Single-query unit
    pub fn query(item: SourceItem) -> Self {
        Self {
            payload: Payload::Query {
                id: item.id,
                body: item.content,
            },
            unit_count: 1,
            retry_count: 0,
        }
    }
}
