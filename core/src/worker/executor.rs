//! Worker execution loop

use crate::config::{RunConfig, TaskKind};
use crate::error::{BenchError, BenchResult};
use crate::request::{Payload, WorkUnit};
use crate::signals::RunSignals;
use crate::traits::TargetClient;

use super::rate_limiter::RequestRateLimiter;
use super::retry::{panic_message, Dispatch};
use super::stats::{WorkerStats, WorkerSummary};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Immutable run settings handed to every worker
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Target collection
    pub collection: String,
    /// Task kind of the run
    pub task: TaskKind,
    /// Retry budget per bulk unit
    pub max_retries: u32,
    /// Bounded wait of one dequeue attempt
    pub poll_timeout: Duration,
    /// Pause after an empty dequeue
    pub idle_backoff: Duration,
    /// Optional requests per second
    pub rate_limit: Option<f64>,
}

impl WorkerSettings {
    /// Extract the worker-facing part of a run configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            task: config.task,
            max_retries: config.max_retries,
            poll_timeout: config.timing.poll_timeout,
            idle_backoff: config.timing.idle_backoff,
            rate_limit: config.rate_limit,
        }
    }
}

/// Worker drains the shared queue: pull -> dispatch -> accumulate -> repeat
///
/// Workers are tokio tasks owned by the Runner. They share the queue, the
/// client and the run signals; everything they count stays local until the
/// single summary handoff at exit.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Target client (shared across workers via Arc)
    client: Arc<dyn TargetClient>,

    /// Shared work queue
    queue: async_channel::Receiver<WorkUnit>,

    /// Where the final summary goes
    results_tx: mpsc::Sender<WorkerSummary>,

    /// Ready counter and stop flag
    signals: Arc<RunSignals>,

    settings: WorkerSettings,

    rate_limiter: RequestRateLimiter,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        client: Arc<dyn TargetClient>,
        queue: async_channel::Receiver<WorkUnit>,
        results_tx: mpsc::Sender<WorkerSummary>,
        signals: Arc<RunSignals>,
        settings: WorkerSettings,
    ) -> Self {
        let rate_limiter = RequestRateLimiter::new(settings.rate_limit);
        Self {
            id,
            client,
            queue,
            results_tx,
            signals,
            settings,
            rate_limiter,
        }
    }

    /// Run the worker to completion and deliver its summary
    ///
    /// The whole drain loop runs under a panic guard, so the summary is
    /// delivered even if something inside the loop panics. Only aborting the
    /// task loses it.
    pub async fn run(self) -> BenchResult<()> {
        let ready = self.signals.mark_ready();
        let mut stats = WorkerStats::new(self.id);
        stats.start();

        tracing::debug!(worker_id = self.id, ready, task = %self.settings.task, "Worker started");

        let outcome = AssertUnwindSafe(self.drain(&mut stats)).catch_unwind().await;
        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            tracing::error!(worker_id = self.id, panic = %message, "Worker panicked");
            stats.panicked = true;
            stats.record_error(format!("worker panicked: {message}"));
        }

        stats.stop();
        let summary = stats.finalize();

        tracing::debug!(
            worker_id = self.id,
            success = summary.success_count,
            failed = summary.fail_count,
            retries = summary.retry_count,
            requests = summary.request_count,
            elapsed_ms = (summary.duration_secs * 1000.0) as u64,
            "Worker finished"
        );

        self.results_tx
            .send(summary)
            .await
            .map_err(|_| BenchError::shutdown())
    }

    /// Pull units until a stop is requested and the queue is empty
    async fn drain(&self, stats: &mut WorkerStats) {
        loop {
            if self.signals.stop_requested() && self.queue.is_empty() {
                tracing::debug!(worker_id = self.id, "Stop requested and queue drained");
                break;
            }

            match tokio::time::timeout(self.settings.poll_timeout, self.queue.recv()).await {
                Ok(Ok(unit)) => self.dispatch(unit, stats).await,
                Ok(Err(_)) => {
                    tracing::debug!(worker_id = self.id, "Work queue closed");
                    break;
                }
                Err(_) => tokio::time::sleep(self.settings.idle_backoff).await,
            }
        }
    }

    async fn dispatch(&self, unit: WorkUnit, stats: &mut WorkerStats) {
        stats.record_items(unit.unit_count);
        #[cfg(test)]
        super::tests::panic_if_marked(&unit);

        let dispatch = Dispatch {
            worker_id: self.id,
            client: self.client.as_ref(),
            collection: &self.settings.collection,
            max_retries: self.settings.max_retries,
            rate_limiter: &self.rate_limiter,
        };

        match unit.payload {
            Payload::Bulk(body) => {
                dispatch
                    .bulk_with_retry(body, unit.unit_count, unit.retry_count, stats)
                    .await
            }
            Payload::Query { id, body } => dispatch.query(&id, &body, stats).await,
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("client", &self.client.name())
            .field("settings", &self.settings)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}
