//! Result aggregation from multiple workers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::LatencyStats;
use crate::worker::WorkerSummary;

/// Cross-worker report of one run
///
/// Built from the summaries that actually arrived, which may be fewer than
/// the configured pool after a forced stop or a collection timeout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Units of items the producer put on the queue
    pub total_produced: usize,

    /// Whether the run was interrupted
    pub cancelled: bool,

    /// Workers the pool was started with
    pub expected_workers: usize,

    /// Workers whose summary was received
    pub worker_count: usize,

    /// Items accepted
    pub total_success: u64,

    /// Items permanently failed
    pub total_fail: u64,

    /// Requests issued, retries included
    pub total_requests: u64,

    /// Retry attempts
    pub total_retries: u64,

    /// Recorded errors
    pub total_errors: u64,

    /// Items covered by consumed work units
    pub total_items: u64,

    /// `success / (success + fail)`, zero when nothing finished
    pub success_rate: f64,

    /// Sum of per-worker items per second
    pub throughput: f64,

    /// Longest worker wall time in seconds
    pub duration_secs: f64,

    /// Approximate cross-worker latency (see [`aggregate_worker_summaries`])
    pub latency: LatencyStats,

    /// Approximate server-reported query time, when any query reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took: Option<LatencyStats>,

    /// Per-worker breakdown ordered by worker id
    pub per_worker: Vec<WorkerSummary>,
}

impl AggregateReport {
    /// Attach the producer's count
    pub fn with_total_produced(mut self, total_produced: usize) -> Self {
        self.total_produced = total_produced;
        self
    }

    /// Mark the run as interrupted
    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Whether some workers never reported
    pub fn is_partial(&self) -> bool {
        self.worker_count < self.expected_workers
    }

    /// Flat mapping of named numeric metrics
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        let mut put = |name: &str, value: f64| {
            metrics.insert(name.to_string(), value);
        };

        put("total_produced", self.total_produced as f64);
        put("expected_workers", self.expected_workers as f64);
        put("worker_count", self.worker_count as f64);
        put("total_success", self.total_success as f64);
        put("total_fail", self.total_fail as f64);
        put("total_requests", self.total_requests as f64);
        put("total_retries", self.total_retries as f64);
        put("total_errors", self.total_errors as f64);
        put("total_items", self.total_items as f64);
        put("success_rate", self.success_rate);
        put("throughput", self.throughput);
        put("duration_secs", self.duration_secs);
        put("latency_avg", self.latency.avg);
        put("latency_min", self.latency.min);
        put("latency_max", self.latency.max);
        put("latency_p50", self.latency.p50);
        put("latency_p95", self.latency.p95);
        put("latency_p99", self.latency.p99);
        if let Some(took) = &self.took {
            put("took_avg", took.avg);
            put("took_p50", took.p50);
            put("took_p95", took.p95);
            put("took_p99", took.p99);
        }

        metrics
    }
}

/// Aggregate the summaries received from a pool of `expected_workers`
///
/// Counts are summed. Throughput is the sum of per-worker throughputs, each
/// over the worker's own wall time. Latency percentiles are approximated by
/// replicating every worker's average latency by its request count; `took`
/// uses the same rule weighted by the number of reported query times.
pub fn aggregate_worker_summaries(
    summaries: &[WorkerSummary],
    expected_workers: usize,
) -> AggregateReport {
    let mut per_worker = summaries.to_vec();
    per_worker.sort_by_key(|s| s.worker_id);

    let total_success: u64 = per_worker.iter().map(|s| s.success_count).sum();
    let total_fail: u64 = per_worker.iter().map(|s| s.fail_count).sum();
    let finished = total_success + total_fail;
    let success_rate = if finished > 0 {
        total_success as f64 / finished as f64
    } else {
        0.0
    };

    let latency_weights: Vec<(f64, u64)> = per_worker
        .iter()
        .map(|s| (s.latency.avg, s.request_count))
        .collect();

    let took_weights: Vec<(f64, u64)> = per_worker
        .iter()
        .filter_map(|s| s.took.map(|t| (t.avg, s.took_count)))
        .collect();
    let took = if took_weights.iter().any(|&(_, n)| n > 0) {
        Some(LatencyStats::from_weighted(&took_weights))
    } else {
        None
    };

    AggregateReport {
        total_produced: 0,
        cancelled: false,
        expected_workers,
        worker_count: per_worker.len(),
        total_success,
        total_fail,
        total_requests: per_worker.iter().map(|s| s.request_count).sum(),
        total_retries: per_worker.iter().map(|s| s.retry_count).sum(),
        total_errors: per_worker.iter().map(|s| s.error_count).sum(),
        total_items: per_worker.iter().map(|s| s.total_items).sum(),
        success_rate,
        throughput: per_worker.iter().map(|s| s.throughput).sum(),
        duration_secs: per_worker
            .iter()
            .map(|s| s.duration_secs)
            .fold(0.0, f64::max),
        latency: LatencyStats::from_weighted(&latency_weights),
        took,
        per_worker,
    }
}
