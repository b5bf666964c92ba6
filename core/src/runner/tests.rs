//! Tests for the Runner module

use super::aggregator::{aggregate_worker_summaries, AggregateReport};
use super::builder::RunnerBuilder;
use super::executor::Runner;
use crate::config::{LifecycleConfig, RunConfig, TaskKind};
use crate::metrics::LatencyStats;
use crate::request::WorkUnit;
use crate::test_support::{bulk_body, ScriptedClient};
use crate::worker::WorkerSummary;

use std::sync::Arc;
use std::time::Duration;

fn config(workers: usize) -> RunConfig {
    RunConfig::new("docs", TaskKind::Ingest)
        .with_workers(workers)
        .with_timing(LifecycleConfig::fast())
}

fn runner(
    client: Arc<ScriptedClient>,
    config: &RunConfig,
) -> (Runner, async_channel::Sender<WorkUnit>) {
    let (queue_tx, queue_rx) = async_channel::bounded(config.queue_capacity);
    let runner = RunnerBuilder::new()
        .config(config)
        .client(client)
        .queue(queue_rx)
        .build()
        .unwrap();
    (runner, queue_tx)
}

fn summary(worker_id: usize, success: u64, fail: u64, requests: u64, avg: f64) -> WorkerSummary {
    WorkerSummary {
        worker_id,
        success_count: success,
        fail_count: fail,
        retry_count: 0,
        request_count: requests,
        total_items: success + fail,
        error_count: fail,
        errors: Vec::new(),
        panicked: false,
        started_at: None,
        duration_secs: 2.0,
        throughput: (success + fail) as f64 / 2.0,
        latency: LatencyStats {
            avg,
            min: avg,
            max: avg,
            p50: avg,
            p95: avg,
            p99: avg,
        },
        took: None,
        took_count: 0,
    }
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_missing_client() {
    let (_tx, rx) = async_channel::bounded::<WorkUnit>(1);
    let err = RunnerBuilder::new()
        .config(&config(1))
        .queue(rx)
        .build()
        .unwrap_err();
    assert!(err.message.contains("client"));
}

#[test]
fn test_builder_missing_settings() {
    let (_tx, rx) = async_channel::bounded::<WorkUnit>(1);
    let err = RunnerBuilder::new()
        .client(Arc::new(ScriptedClient::new()))
        .queue(rx)
        .build()
        .unwrap_err();
    assert!(err.message.contains("settings"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_graceful_run_collects_every_worker() {
    let config = config(4);
    let (mut runner, queue_tx) = runner(Arc::new(ScriptedClient::new()), &config);

    runner.start(4).unwrap();
    assert!(runner.wait_until_ready(Duration::from_secs(5)).await);
    assert_eq!(runner.ready_count(), 4);

    for _ in 0..10 {
        queue_tx.send(WorkUnit::bulk(bulk_body(100))).await.unwrap();
    }

    runner.stop(false).await;
    let report = runner.collect_metrics(Duration::from_secs(2)).await;

    assert_eq!(report.worker_count, 4);
    assert_eq!(report.expected_workers, 4);
    assert!(!report.is_partial());
    assert_eq!(report.total_success, 1000);
    assert_eq!(report.total_fail, 0);
    assert_eq!(report.total_items, 1000);
    assert_eq!(report.total_requests, 10);
    assert_eq!(report.success_rate, 1.0);
    assert!(queue_tx.is_empty());
    assert_eq!(
        report.per_worker.iter().map(|w| w.worker_id).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_collect_metrics_is_idempotent() {
    let config = config(2);
    let (mut runner, queue_tx) = runner(Arc::new(ScriptedClient::new()), &config);

    runner.start(2).unwrap();
    runner.wait_until_ready(Duration::from_secs(5)).await;
    for _ in 0..3 {
        queue_tx.send(WorkUnit::bulk(bulk_body(10))).await.unwrap();
    }
    runner.stop(false).await;

    let first = runner.collect_metrics(Duration::from_secs(1)).await;
    let second = runner.collect_metrics(Duration::from_millis(50)).await;

    assert_eq!(first.total_success, 30);
    assert_eq!(second.total_success, first.total_success);
    assert_eq!(second.total_requests, first.total_requests);
    assert_eq!(second.worker_count, first.worker_count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forced_stop_yields_partial_report() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(10)));
    let config = config(3);
    let (mut runner, queue_tx) = runner(client, &config);

    runner.start(3).unwrap();
    runner.wait_until_ready(Duration::from_secs(5)).await;
    for _ in 0..3 {
        queue_tx.send(WorkUnit::bulk(bulk_body(10))).await.unwrap();
    }
    // let every worker pick up a unit and block inside the client
    tokio::time::sleep(Duration::from_millis(100)).await;

    runner.stop(true).await;
    let report = runner.collect_metrics(Duration::from_millis(200)).await;

    assert!(report.worker_count < 3);
    assert!(report.is_partial());
    assert_eq!(report.expected_workers, 3);
    assert_eq!(report.total_success, 0);
    assert_eq!(report.success_rate, 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_straggler_is_aborted_after_join_timeout() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(10)));
    let mut timing = LifecycleConfig::fast();
    timing.join_timeout = Duration::from_millis(100);
    let config = config(2).with_timing(timing);
    let (mut runner, queue_tx) = runner(client, &config);

    runner.start(2).unwrap();
    runner.wait_until_ready(Duration::from_secs(5)).await;
    queue_tx.send(WorkUnit::bulk(bulk_body(5))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    runner.stop(false).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    // the idle worker drains and reports; the stuck one is aborted
    let report = runner.collect_metrics(Duration::from_millis(500)).await;
    assert_eq!(report.worker_count, 1);
    assert_eq!(report.total_success, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupted_graceful_stop_leaves_workers_to_force() {
    let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(10)));
    let mut timing = LifecycleConfig::fast();
    timing.join_timeout = Duration::from_secs(10);
    let config = config(1).with_timing(timing);
    let (mut runner, queue_tx) = runner(client.clone(), &config);
    let idle_refs = Arc::strong_count(&client);

    runner.start(1).unwrap();
    runner.wait_until_ready(Duration::from_secs(5)).await;
    queue_tx.send(WorkUnit::bulk(bulk_body(5))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let graceful = tokio::time::timeout(Duration::from_millis(200), runner.stop(false)).await;
    assert!(graceful.is_err());

    let started = std::time::Instant::now();
    runner.stop(true).await;
    assert!(started.elapsed() < Duration::from_secs(1));

    // an aborted worker releases its client handle
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(Arc::strong_count(&client), idle_refs);
}

#[tokio::test]
async fn test_start_rejects_restart_and_empty_pool() {
    let config = config(1);
    let (mut runner, _queue_tx) = runner(Arc::new(ScriptedClient::new()), &config);

    assert!(runner.start(0).is_err());
    runner.start(1).unwrap();
    assert!(runner.start(1).is_err());
    assert_eq!(runner.worker_count(), 1);

    runner.stop(false).await;
}

#[tokio::test]
async fn test_wait_until_ready_times_out_without_workers() {
    let config = config(1);
    let (mut runner, _queue_tx) = runner(Arc::new(ScriptedClient::new()), &config);
    runner.start(1).unwrap();
    runner.stop(true).await;

    // an aborted pool may never reach the barrier; the wait must still end
    let started = std::time::Instant::now();
    runner.wait_until_ready(Duration::from_millis(50)).await;
    assert!(started.elapsed() < Duration::from_secs(1));
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_empty() {
    let report = aggregate_worker_summaries(&[], 4);
    assert_eq!(report.worker_count, 0);
    assert_eq!(report.expected_workers, 4);
    assert_eq!(report.success_rate, 0.0);
    assert_eq!(report.throughput, 0.0);
    assert_eq!(report.latency, LatencyStats::default());
    assert!(report.took.is_none());
    assert!(report.is_partial());
}

#[test]
fn test_aggregate_sums_counts_and_throughput() {
    let summaries = vec![
        summary(1, 90, 10, 10, 20.0),
        summary(0, 100, 0, 10, 10.0),
    ];
    let report = aggregate_worker_summaries(&summaries, 2);

    assert_eq!(report.total_success, 190);
    assert_eq!(report.total_fail, 10);
    assert_eq!(report.total_requests, 20);
    assert_eq!(report.total_errors, 10);
    assert!((report.success_rate - 0.95).abs() < 1e-9);
    assert!((report.throughput - 100.0).abs() < 1e-9);
    assert_eq!(report.duration_secs, 2.0);
    assert_eq!(report.per_worker[0].worker_id, 0);
}

#[test]
fn test_aggregate_latency_weights_by_requests() {
    let summaries = vec![
        summary(0, 10, 0, 90, 10.0),
        summary(1, 10, 0, 10, 100.0),
        summary(2, 0, 0, 0, 0.0),
    ];
    let report = aggregate_worker_summaries(&summaries, 3);

    assert_eq!(report.latency.p50, 10.0);
    assert_eq!(report.latency.p95, 100.0);
    assert_eq!(report.latency.min, 10.0);
    assert_eq!(report.latency.max, 100.0);
    assert!((report.latency.avg - 19.0).abs() < 1e-9);
    assert!(report.latency.p50 <= report.latency.p95);
    assert!(report.latency.p95 <= report.latency.p99);
}

#[test]
fn test_aggregate_took_only_when_reported() {
    let mut with_took = summary(0, 5, 0, 5, 4.0);
    with_took.took = Some(LatencyStats {
        avg: 2.0,
        min: 1.0,
        max: 3.0,
        p50: 2.0,
        p95: 3.0,
        p99: 3.0,
    });
    with_took.took_count = 5;

    let report = aggregate_worker_summaries(&[with_took, summary(1, 5, 0, 5, 4.0)], 2);
    assert_eq!(report.took.unwrap().avg, 2.0);

    let report = aggregate_worker_summaries(&[summary(0, 5, 0, 5, 4.0)], 1);
    assert!(report.took.is_none());
}

#[test]
fn test_metrics_mapping() {
    let report: AggregateReport = aggregate_worker_summaries(&[summary(0, 8, 2, 4, 12.0)], 1)
        .with_total_produced(10)
        .with_cancelled(false);
    let metrics = report.metrics();

    assert_eq!(metrics["total_produced"], 10.0);
    assert_eq!(metrics["total_success"], 8.0);
    assert_eq!(metrics["total_fail"], 2.0);
    assert_eq!(metrics["success_rate"], 0.8);
    assert_eq!(metrics["latency_p50"], 12.0);
    assert!(!metrics.contains_key("took_avg"));
}
