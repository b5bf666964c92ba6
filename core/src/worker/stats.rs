//! Worker statistics tracking

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::LatencyStats;

/// Error messages kept per worker; the count keeps going past this
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Accumulator owned by exactly one worker for its whole lifetime
///
/// Only the owning worker mutates it. At termination it is folded into a
/// [`WorkerSummary`] and handed over by value.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// Owning worker
    pub worker_id: usize,

    /// Items accepted by the target
    pub success_count: u64,

    /// Items permanently failed
    pub fail_count: u64,

    /// Retry attempts (not retried items)
    pub retry_count: u64,

    /// Requests issued, retries included
    pub request_count: u64,

    /// Items covered by the work units this worker consumed
    pub total_items: u64,

    /// Client-side latency of every request, in milliseconds
    pub latencies: Vec<f64>,

    /// Server-reported query time, in milliseconds
    pub took: Vec<f64>,

    /// First recorded error messages
    pub errors: Vec<String>,

    /// Total number of recorded errors
    pub error_count: u64,

    /// Set when the worker body panicked
    pub panicked: bool,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,

    started_wall: Option<DateTime<Utc>>,
}

impl WorkerStats {
    /// Create new empty stats for a worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            success_count: 0,
            fail_count: 0,
            retry_count: 0,
            request_count: 0,
            total_items: 0,
            latencies: Vec::new(),
            took: Vec::new(),
            errors: Vec::new(),
            error_count: 0,
            panicked: false,
            started_at: None,
            ended_at: None,
            started_wall: None,
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.started_wall = Some(Utc::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record one issued request and its latency
    pub fn record_request(&mut self, latency: Duration) {
        self.request_count += 1;
        self.latencies.push(latency.as_secs_f64() * 1000.0);
    }

    /// Record server-reported processing time
    pub fn record_took(&mut self, took_ms: u64) {
        self.took.push(took_ms as f64);
    }

    /// Record items accepted by the target
    pub fn record_success(&mut self, items: usize) {
        self.success_count += items as u64;
    }

    /// Record items that failed for good
    pub fn record_failure(&mut self, items: usize) {
        self.fail_count += items as u64;
    }

    /// Record one retry attempt
    pub fn record_retry(&mut self) {
        self.retry_count += 1;
    }

    /// Record a consumed work unit covering `items` items
    pub fn record_items(&mut self, items: usize) {
        self.total_items += items as u64;
    }

    /// Record an error message
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(message.into());
        }
    }

    /// Fold the accumulator into its final summary
    pub fn finalize(self) -> WorkerSummary {
        let duration = self.elapsed().unwrap_or_default();
        let duration_secs = duration.as_secs_f64();
        let throughput = if duration_secs > 0.0 {
            self.total_items as f64 / duration_secs
        } else {
            0.0
        };

        let took = if self.took.is_empty() {
            None
        } else {
            Some(LatencyStats::from_values(&self.took))
        };

        WorkerSummary {
            worker_id: self.worker_id,
            success_count: self.success_count,
            fail_count: self.fail_count,
            retry_count: self.retry_count,
            request_count: self.request_count,
            total_items: self.total_items,
            error_count: self.error_count,
            errors: self.errors,
            panicked: self.panicked,
            started_at: self.started_wall,
            duration_secs,
            throughput,
            latency: LatencyStats::from_values(&self.latencies),
            took,
            took_count: self.took.len() as u64,
        }
    }
}

/// Final, read-only statistics of one worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    /// Worker identifier
    pub worker_id: usize,
    /// Items accepted by the target
    pub success_count: u64,
    /// Items permanently failed
    pub fail_count: u64,
    /// Retry attempts
    pub retry_count: u64,
    /// Requests issued
    pub request_count: u64,
    /// Items covered by consumed work units
    pub total_items: u64,
    /// Total number of recorded errors
    pub error_count: u64,
    /// First recorded error messages
    pub errors: Vec<String>,
    /// Whether the worker body panicked
    pub panicked: bool,
    /// Wall-clock start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Worker wall time in seconds
    pub duration_secs: f64,
    /// Items per second over the worker's own wall time
    pub throughput: f64,
    /// Client-side latency statistics
    pub latency: LatencyStats,
    /// Server-reported query time statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took: Option<LatencyStats>,
    /// Number of server-reported query times
    pub took_count: u64,
}
