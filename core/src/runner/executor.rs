//! Runner execution logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::ChannelConfig;
use crate::config::LifecycleConfig;
use crate::error::{BenchError, BenchResult};
use crate::request::WorkUnit;
use crate::signals::RunSignals;
use crate::traits::TargetClient;
use crate::worker::{WorkerBuilder, WorkerSettings, WorkerSummary};

use super::aggregator::{aggregate_worker_summaries, AggregateReport};

const READY_POLL: Duration = Duration::from_millis(20);

/// Runner supervises one pool of workers for a single run
///
/// Responsible for spawning workers, the ready barrier, the stop signal and
/// collecting worker summaries into an [`AggregateReport`].
pub struct Runner {
    /// Target client (shared across workers)
    pub(crate) client: Arc<dyn TargetClient>,

    /// Consumer side of the shared work queue
    pub(crate) queue: async_channel::Receiver<WorkUnit>,

    /// Settings cloned into every worker
    pub(crate) settings: WorkerSettings,

    /// Lifecycle timeouts
    pub(crate) timing: LifecycleConfig,

    /// Results channel sizing
    pub(crate) channels: ChannelConfig,

    /// Ready counter and stop flag of this run
    pub(crate) signals: Arc<RunSignals>,

    handles: Vec<JoinHandle<()>>,
    results_rx: Option<mpsc::Receiver<WorkerSummary>>,
    received: Vec<WorkerSummary>,
    worker_count: usize,
}

impl Runner {
    /// Create a new runner
    ///
    /// Use `RunnerBuilder` for a more ergonomic construction.
    pub fn new(
        client: Arc<dyn TargetClient>,
        queue: async_channel::Receiver<WorkUnit>,
        settings: WorkerSettings,
        timing: LifecycleConfig,
        channels: ChannelConfig,
    ) -> Self {
        Self {
            client,
            queue,
            settings,
            timing,
            channels,
            signals: Arc::new(RunSignals::new()),
            handles: Vec::new(),
            results_rx: None,
            received: Vec::new(),
            worker_count: 0,
        }
    }

    /// Spawn `worker_count` workers on the shared queue
    pub fn start(&mut self, worker_count: usize) -> BenchResult<()> {
        if self.results_rx.is_some() {
            return Err(BenchError::runner("runner already started"));
        }
        if worker_count == 0 {
            return Err(BenchError::config("worker count must be at least 1"));
        }

        let buffer = self.channels.effective_results_buffer(worker_count);
        let (results_tx, results_rx) = mpsc::channel(buffer);

        tracing::info!(
            workers = worker_count,
            collection = %self.settings.collection,
            task = %self.settings.task,
            max_retries = self.settings.max_retries,
            rate_limit = ?self.settings.rate_limit,
            "Starting worker pool"
        );

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = WorkerBuilder::new(worker_id)
                .client(Arc::clone(&self.client))
                .queue(self.queue.clone())
                .results_tx(results_tx.clone())
                .signals(Arc::clone(&self.signals))
                .settings(self.settings.clone())
                .build()?;

            handles.push(tokio::spawn(async move {
                if let Err(e) = worker.run().await {
                    tracing::debug!(worker_id, error = %e, "Worker could not deliver its summary");
                }
            }));
        }

        // Only workers hold senders now, so the channel closes once they are all gone.
        drop(results_tx);

        self.handles = handles;
        self.results_rx = Some(results_rx);
        self.worker_count = worker_count;
        Ok(())
    }

    /// Wait until every worker has reported ready
    ///
    /// Returns `false` on timeout. Callers may proceed anyway: late workers
    /// still join the pool.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self.signals.ready_count();
            if ready >= self.worker_count {
                tracing::info!(ready, "All workers ready");
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    ready,
                    expected = self.worker_count,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for workers, proceeding anyway"
                );
                return false;
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Number of workers that have started
    pub fn ready_count(&self) -> usize {
        self.signals.ready_count()
    }

    /// Number of workers spawned by [`Runner::start`]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stop the pool
    ///
    /// Raises the stop flag. With `force`, every worker is aborted at once and
    /// summaries not yet delivered are lost. Otherwise each worker gets
    /// `join_timeout` to drain the queue and deliver its summary before it is
    /// aborted.
    ///
    /// A graceful stop may be dropped part way; workers not yet joined stay
    /// with the runner, so a following forced stop still aborts them.
    pub async fn stop(&mut self, force: bool) {
        self.signals.request_stop();

        if force {
            tracing::warn!(workers = self.handles.len(), "Force-stopping worker pool");
            for handle in self.handles.drain(..) {
                handle.abort();
            }
            return;
        }

        tracing::info!(workers = self.handles.len(), "Stopping worker pool");
        while !self.handles.is_empty() {
            let worker_id = self.worker_count - self.handles.len();
            let handle = &mut self.handles[0];
            match tokio::time::timeout(self.timing.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(worker_id, error = %e, "Worker task failed");
                }
                Err(_) => {
                    tracing::warn!(
                        worker_id,
                        timeout_ms = self.timing.join_timeout.as_millis() as u64,
                        "Worker did not stop in time, aborting"
                    );
                    self.handles[0].abort();
                }
            }
            self.handles.remove(0);
        }
    }

    /// Collect worker summaries and aggregate them
    ///
    /// Waits until every spawned worker has reported, the channel closes or
    /// `timeout` elapses; a short count yields a partial report. Summaries
    /// are kept across calls, so calling again never counts one twice.
    pub async fn collect_metrics(&mut self, timeout: Duration) -> AggregateReport {
        let deadline = tokio::time::Instant::now() + timeout;

        if let Some(rx) = self.results_rx.as_mut() {
            while self.received.len() < self.worker_count {
                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(summary)) => self.received.push(summary),
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
        }

        if self.received.len() < self.worker_count {
            tracing::warn!(
                received = self.received.len(),
                expected = self.worker_count,
                "Collected metrics from a subset of workers"
            );
        }

        let report = aggregate_worker_summaries(&self.received, self.worker_count);
        tracing::info!(
            workers = report.worker_count,
            success = report.total_success,
            failed = report.total_fail,
            retries = report.total_retries,
            throughput = report.throughput,
            "Collected run metrics"
        );
        report
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("client", &self.client.name())
            .field("settings", &self.settings)
            .field("workers", &self.worker_count)
            .field("ready", &self.signals.ready_count())
            .field("received", &self.received.len())
            .finish()
    }
}
