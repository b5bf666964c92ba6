//! Raw response bodies as returned by the service
//!
//! These mirror the JSON the server sends and are converted into the
//! client-neutral types from `osbench_core` before they reach a worker.

use std::collections::BTreeMap;

use osbench_core::{BulkItemResult, BulkResponse, QueryResponse};
use serde::Deserialize;
use serde_json::Value;

/// `_bulk` response
#[derive(Debug, Deserialize)]
pub struct RawBulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BTreeMap<String, RawBulkItem>>,
}

/// One item, found under its action key (`index`, `create`, ...)
#[derive(Debug, Deserialize)]
pub struct RawBulkItem {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl From<RawBulkResponse> for BulkResponse {
    fn from(raw: RawBulkResponse) -> Self {
        let items = raw
            .items
            .into_iter()
            .map(|entry| match entry.into_values().next() {
                Some(RawBulkItem {
                    status,
                    error: Some(error),
                }) => BulkItemResult::failed(status, error),
                Some(RawBulkItem { status, error: None }) => BulkItemResult::ok(status),
                // an item with no action key still occupies its slot
                None => BulkItemResult::failed(0, Value::String("empty bulk item".into())),
            })
            .collect();

        BulkResponse {
            took: raw.took,
            errors: raw.errors,
            items,
        }
    }
}

/// `_search` response
#[derive(Debug, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: Option<u64>,
    #[serde(default)]
    pub hits: RawHits,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub hits: Vec<Value>,
}

impl From<RawSearchResponse> for QueryResponse {
    fn from(raw: RawSearchResponse) -> Self {
        QueryResponse::new(raw.took, raw.hits.hits.len())
    }
}

/// Root endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    /// Cluster name
    #[serde(default)]
    pub cluster_name: String,
    /// Server version
    #[serde(default)]
    pub version: ClusterVersion,
}

/// Version block of [`ClusterInfo`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterVersion {
    /// Version number, e.g. "2.11.0"
    #[serde(default)]
    pub number: String,
    /// Distribution name, absent on older servers
    #[serde(default)]
    pub distribution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_items_keep_request_order() {
        let raw: RawBulkResponse = serde_json::from_value(json!({
            "took": 30,
            "errors": true,
            "items": [
                { "index": { "_index": "docs", "_id": "1", "status": 201, "result": "created" } },
                { "index": { "_index": "docs", "_id": "2", "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse" } } },
                { "create": { "_index": "docs", "_id": "3", "status": 200 } }
            ]
        }))
        .unwrap();

        let response = BulkResponse::from(raw);
        assert_eq!(response.took, 30);
        assert!(response.errors);
        assert_eq!(response.items.len(), 3);
        assert_eq!(response.failed_indices(), vec![1]);
        assert_eq!(
            response.first_error().unwrap()["type"],
            "mapper_parsing_exception"
        );
    }

    #[test]
    fn test_search_counts_returned_hits() {
        let raw: RawSearchResponse = serde_json::from_value(json!({
            "took": 5,
            "timed_out": false,
            "hits": {
                "total": { "value": 120, "relation": "eq" },
                "hits": [ { "_id": "a" }, { "_id": "b" } ]
            }
        }))
        .unwrap();

        assert_eq!(QueryResponse::from(raw), QueryResponse::new(Some(5), 2));
    }

    #[test]
    fn test_search_without_hits() {
        let raw: RawSearchResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(QueryResponse::from(raw), QueryResponse::new(None, 0));
    }
}
