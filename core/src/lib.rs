//! osbench-core: load-generation pipeline for OpenSearch-style services
//!
//! This crate provides the pipeline shared by every osbench component:
//!
//! - Work units, bulk bodies and the target-client contract
//! - The worker pool: workers, the runner that supervises them and the
//!   manager that feeds the bounded work queue
//! - Per-worker statistics and cross-worker aggregation
//! - Run configuration and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod producer;
pub mod request;
pub mod response;
pub mod runner;
pub mod signals;
pub mod task;
pub mod traits;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use channel::ChannelConfig;
pub use config::{ConfigError, LifecycleConfig, RunConfig, TaskKind};
pub use error::*;
pub use metrics::LatencyStats;
pub use producer::{exit_on_interrupt, spawn_interrupt_listener, CancelHandle, Manager};
pub use request::*;
pub use response::*;
pub use runner::{aggregate_worker_summaries, AggregateReport, Runner, RunnerBuilder};
pub use signals::RunSignals;
pub use task::{BenchTask, ExecuteOptions};
pub use traits::*;
pub use worker::{RequestRateLimiter, Worker, WorkerBuilder, WorkerSettings, WorkerSummary};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_work_unit_roundtrip() {
        let unit = WorkUnit::query(SourceItem::new("q7", json!({ "query": { "term": { "tag": "a" } } })));
        let json = serde_json::to_string(&unit).unwrap();
        let back: WorkUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);
    }

    #[test]
    fn test_report_serializes_flat_totals() {
        let report = AggregateReport::default().with_total_produced(5);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["total_produced"], 5);
        assert_eq!(value["success_rate"], 0.0);
        assert!(value["per_worker"].as_array().unwrap().is_empty());
        assert!(value.get("took").is_none());
    }

    #[test]
    fn test_bulk_response_deserializes_partial_items() {
        let raw = json!({
            "took": 12,
            "errors": true,
            "items": [
                { "status": 201 },
                { "status": 429, "error": { "type": "es_rejected_execution_exception" } }
            ]
        });
        let response: BulkResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.failed_indices(), vec![1]);
    }
}
