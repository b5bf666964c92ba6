//! Scripted target client shared by the pipeline test suites

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::request::{BulkBody, BulkOperation, SourceItem};
use crate::response::{BulkItemResult, BulkResponse, QueryResponse};
use crate::traits::{TargetClient, TransportError};

/// Scripted outcome of one bulk call
#[derive(Debug, Clone)]
pub enum BulkStep {
    /// Reject the items at these positions, accept the rest
    Reject(Vec<usize>),
    /// Fail the whole request
    Transport,
    /// Panic inside the client
    Panic,
}

/// Call observed by the client
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Bulk write with this many operations
    Bulk(usize),
    /// Query
    Query,
}

/// Test double for [`TargetClient`]
///
/// Bulk calls follow the script in order; once it runs out every item is
/// accepted.
#[derive(Default)]
pub struct ScriptedClient {
    bulk_script: Mutex<VecDeque<BulkStep>>,
    fail_queries: bool,
    took: Option<u64>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bulk_steps(self, steps: impl IntoIterator<Item = BulkStep>) -> Self {
        if let Ok(mut script) = self.bulk_script.lock() {
            script.extend(steps);
        }
        self
    }

    pub fn with_failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn with_took(mut self, took: u64) -> Self {
        self.took = Some(took);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TargetClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn write_batch(
        &self,
        _collection: &str,
        body: &BulkBody,
    ) -> Result<BulkResponse, TransportError> {
        self.record(Call::Bulk(body.len()));
        self.pause().await;

        let step = self.bulk_script.lock().unwrap().pop_front();
        match step {
            None => Ok(BulkResponse::success(body.len())),
            Some(BulkStep::Transport) => {
                Err(TransportError::Connection("connection reset".into()))
            }
            Some(BulkStep::Panic) => panic!("scripted client panic"),
            Some(BulkStep::Reject(indices)) => {
                let items = (0..body.len())
                    .map(|i| {
                        if indices.contains(&i) {
                            BulkItemResult::failed(
                                429,
                                json!({ "type": "es_rejected_execution_exception", "reason": "queue full" }),
                            )
                        } else {
                            BulkItemResult::ok(201)
                        }
                    })
                    .collect();
                Ok(BulkResponse {
                    took: 1,
                    errors: true,
                    items,
                })
            }
        }
    }

    async fn query(&self, _collection: &str, _body: &Value) -> Result<QueryResponse, TransportError> {
        self.record(Call::Query);
        self.pause().await;

        if self.fail_queries {
            return Err(TransportError::Status {
                status: 500,
                body: "search failed".into(),
            });
        }
        Ok(QueryResponse::new(self.took, 10))
    }
}

/// `n` numbered documents
pub fn documents(n: usize) -> Vec<SourceItem> {
    (0..n)
        .map(|i| SourceItem::new(i.to_string(), json!({ "title": format!("doc {i}"), "n": i })))
        .collect()
}

/// Bulk body indexing `n` numbered documents into "docs"
pub fn bulk_body(n: usize) -> BulkBody {
    BulkBody::new(
        documents(n)
            .into_iter()
            .map(|item| BulkOperation::index("docs", item))
            .collect(),
    )
}
