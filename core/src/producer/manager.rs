//! Manager: producer side of a run

use std::sync::Arc;

use crate::channel::ChannelConfig;
use crate::config::RunConfig;
use crate::error::BenchResult;
use crate::request::{BulkBody, BulkOperation, SourceItem, WorkUnit};
use crate::runner::{AggregateReport, RunnerBuilder};
use crate::traits::TargetClient;

use super::progress::ProgressTracker;
use super::signal::{spawn_interrupt_listener, CancelHandle};

/// Manager turns a source into work units and drives one run end to end
///
/// It owns the bounded work queue. A run starts a fresh [`Runner`] pool,
/// streams the source into the queue under backpressure, waits for the queue
/// to drain and stops the pool: gracefully after a clean finish, forcibly
/// after an interrupt.
///
/// [`Runner`]: crate::runner::Runner
pub struct Manager {
    config: RunConfig,
    client: Arc<dyn TargetClient>,
    channels: ChannelConfig,
    queue_tx: async_channel::Sender<WorkUnit>,
    queue_rx: async_channel::Receiver<WorkUnit>,
    cancel: CancelHandle,
    progress: ProgressTracker,
    total_produced: usize,
    units_produced: usize,
}

impl Manager {
    /// Create a manager for a validated configuration
    pub fn new(config: RunConfig, client: Arc<dyn TargetClient>) -> BenchResult<Self> {
        config.validate()?;
        let (queue_tx, queue_rx) = async_channel::bounded(config.queue_capacity);

        Ok(Self {
            config,
            client,
            channels: ChannelConfig::default(),
            queue_tx,
            queue_rx,
            cancel: CancelHandle::new(),
            progress: ProgressTracker::new(false),
            total_produced: 0,
            units_produced: 0,
        })
    }

    /// Draw a terminal progress bar instead of logging progress
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = ProgressTracker::new(enabled);
        self
    }

    /// Override the results channel configuration
    pub fn with_channel_config(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    /// Handle that interrupts the current run
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Items enqueued by the last production pass
    pub fn total_produced(&self) -> usize {
        self.total_produced
    }

    /// Work units enqueued by the last production pass
    pub fn units_produced(&self) -> usize {
        self.units_produced
    }

    /// Work units currently waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.queue_tx.len()
    }

    /// Consumer side of the work queue
    pub fn queue_receiver(&self) -> async_channel::Receiver<WorkUnit> {
        self.queue_rx.clone()
    }

    /// Turn `source` into work units and enqueue them
    ///
    /// Bulk runs group items into units of `batch_size` and flush the trailing
    /// partial batch at the end; search runs enqueue every item on its own.
    /// A blocking enqueue waits for queue space; a non-blocking one drops the
    /// unit when the queue is full and does not count it. Cancellation is
    /// checked before every source item; a partially filled batch is
    /// discarded at that point.
    ///
    /// Returns the number of items enqueued.
    pub async fn produce<I>(&mut self, source: I, blocking: bool, total_count: Option<usize>) -> usize
    where
        I: IntoIterator<Item = SourceItem>,
    {
        self.total_produced = 0;
        self.units_produced = 0;
        self.progress.start(total_count);

        let batch_size = self.config.batch_size;
        let batched = self.config.task.is_batched();
        let mut batch: Vec<BulkOperation> = Vec::with_capacity(if batched { batch_size } else { 0 });
        let mut items = source.into_iter();

        loop {
            if self.cancel.is_cancelled() {
                if !batch.is_empty() {
                    tracing::warn!(
                        discarded = batch.len(),
                        "Cancelled with a partial batch, discarding it"
                    );
                }
                tracing::info!(produced = self.total_produced, "Producer cancelled");
                self.progress.finish("cancelled");
                return self.total_produced;
            }

            let Some(item) = items.next() else {
                break;
            };
            self.progress.advance(1);

            if batched {
                batch.push(BulkOperation::index(&self.config.collection, item));
                if batch.len() >= batch_size {
                    let body = BulkBody::new(std::mem::replace(
                        &mut batch,
                        Vec::with_capacity(batch_size),
                    ));
                    self.enqueue(WorkUnit::bulk(body), blocking).await;
                }
            } else {
                self.enqueue(WorkUnit::query(item), blocking).await;
            }
        }

        if !batch.is_empty() {
            self.enqueue(WorkUnit::bulk(BulkBody::new(batch)), blocking)
                .await;
        }

        tracing::info!(
            produced = self.total_produced,
            units = self.units_produced,
            elapsed_ms = self.progress.elapsed().as_millis() as u64,
            "Source exhausted"
        );
        self.progress.finish("done");
        self.total_produced
    }

    /// Put one unit on the queue; returns whether it was enqueued
    async fn enqueue(&mut self, unit: WorkUnit, blocking: bool) -> bool {
        let count = unit.unit_count;

        let accepted = if blocking {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(unit_count = count, "Cancelled while waiting for queue space");
                    false
                }
                sent = self.queue_tx.send(unit) => sent.is_ok(),
            }
        } else {
            match self.queue_tx.try_send(unit) {
                Ok(()) => true,
                Err(async_channel::TrySendError::Full(_)) => {
                    tracing::debug!(unit_count = count, "Queue full, dropping work unit");
                    false
                }
                Err(async_channel::TrySendError::Closed(_)) => false,
            }
        };

        if accepted {
            self.total_produced += count;
            self.units_produced += 1;
        }
        accepted
    }

    /// Wait until the workers have emptied the queue
    ///
    /// Returns `false` if the run was cancelled first.
    pub async fn wait_for_drain(&self) -> bool {
        loop {
            if self.queue_tx.is_empty() {
                return true;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.config.timing.drain_poll) => {}
            }
        }
    }

    /// Discard units a previous run left in the queue
    fn purge_leftovers(&self) -> usize {
        let mut purged = 0;
        while self.queue_rx.try_recv().is_ok() {
            purged += 1;
        }
        purged
    }

    /// Execute one complete run over `source`
    pub async fn run<I>(&mut self, source: I, total_count: Option<usize>) -> BenchResult<AggregateReport>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        self.cancel.reset();
        self.run_inner(source, total_count).await
    }

    /// Run with Ctrl+C handling
    ///
    /// An interrupt cancels the producer and turns the final stop into a
    /// forced one, also while a graceful stop is under way. The listener is
    /// removed when the run returns; see [`exit_on_interrupt`](super::exit_on_interrupt) for what the
    /// caller can install afterwards.
    pub async fn run_with_signal_handling<I>(
        &mut self,
        source: I,
        total_count: Option<usize>,
    ) -> BenchResult<AggregateReport>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        self.cancel.reset();
        let cancel = self.cancel.clone();

        let signal_handle = spawn_interrupt_listener(tokio::signal::ctrl_c(), move || {
            tracing::warn!("Received Ctrl+C, stopping run");
            cancel.cancel();
        });

        let result = self.run_inner(source, total_count).await;

        signal_handle.abort();

        result
    }

    async fn run_inner<I>(&mut self, source: I, total_count: Option<usize>) -> BenchResult<AggregateReport>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        let purged = self.purge_leftovers();
        if purged > 0 {
            tracing::warn!(purged, "Discarded work units left over from a previous run");
        }

        let mut runner = RunnerBuilder::new()
            .config(&self.config)
            .client(Arc::clone(&self.client))
            .queue(self.queue_rx.clone())
            .channel_config(self.channels.clone())
            .build()?;

        runner.start(self.config.workers)?;
        runner
            .wait_until_ready(self.config.timing.ready_timeout)
            .await;

        tracing::info!(
            collection = %self.config.collection,
            task = %self.config.task,
            workers = self.config.workers,
            batch_size = self.config.batch_size,
            queue_capacity = self.config.queue_capacity,
            total = ?total_count,
            "Starting run"
        );

        let produced = self.produce(source, true, total_count).await;

        let drained = !self.cancel.is_cancelled() && self.wait_for_drain().await;
        let mut forced = !drained;
        if forced {
            tracing::warn!(produced, "Run interrupted, force-stopping workers");
            runner.stop(true).await;
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::warn!(produced, "Interrupted while stopping, force-stopping workers");
                    forced = true;
                }
                _ = runner.stop(false) => {}
            }
            if forced {
                runner.stop(true).await;
            }
        }

        let report = runner
            .collect_metrics(self.config.timing.collect_timeout)
            .await
            .with_total_produced(produced)
            .with_cancelled(forced);

        tracing::info!(
            produced = report.total_produced,
            success = report.total_success,
            failed = report.total_fail,
            success_rate = report.success_rate,
            throughput = report.throughput,
            cancelled = report.cancelled,
            "Run complete"
        );

        Ok(report)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("client", &self.client.name())
            .field("queued", &self.queue_tx.len())
            .field("total_produced", &self.total_produced)
            .finish()
    }
}
