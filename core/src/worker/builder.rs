//! Builder pattern for Worker construction

use crate::error::{BenchError, BenchResult};
use crate::request::WorkUnit;
use crate::signals::RunSignals;
use crate::traits::TargetClient;

use super::executor::{Worker, WorkerSettings};
use super::stats::WorkerSummary;

use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .client(client)
///     .queue(queue_rx)
///     .results_tx(results_tx)
///     .signals(signals)
///     .settings(WorkerSettings::from_config(&config))
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<dyn TargetClient>>,
    queue: Option<async_channel::Receiver<WorkUnit>>,
    results_tx: Option<mpsc::Sender<WorkerSummary>>,
    signals: Option<Arc<RunSignals>>,
    settings: Option<WorkerSettings>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            queue: None,
            results_tx: None,
            signals: None,
            settings: None,
        }
    }

    /// Set the target client
    pub fn client(mut self, client: Arc<dyn TargetClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the shared work queue
    pub fn queue(mut self, queue: async_channel::Receiver<WorkUnit>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the results channel sender
    pub fn results_tx(mut self, tx: mpsc::Sender<WorkerSummary>) -> Self {
        self.results_tx = Some(tx);
        self
    }

    /// Set the shared run signals
    pub fn signals(mut self, signals: Arc<RunSignals>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Set the run settings
    pub fn settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<Worker> {
        let client = self.client.ok_or_else(|| BenchError::missing_config("client"))?;
        let queue = self.queue.ok_or_else(|| BenchError::missing_config("queue"))?;
        let results_tx = self
            .results_tx
            .ok_or_else(|| BenchError::missing_config("results_tx"))?;
        let signals = self
            .signals
            .ok_or_else(|| BenchError::missing_config("signals"))?;
        let settings = self
            .settings
            .ok_or_else(|| BenchError::missing_config("settings"))?;

        Ok(Worker::new(
            self.id, client, queue, results_tx, signals, settings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, TaskKind};

    fn settings() -> WorkerSettings {
        WorkerSettings::from_config(&RunConfig::new("docs", TaskKind::Ingest))
    }

    #[test]
    fn test_builder_missing_client() {
        let (_tx, rx) = async_channel::bounded::<WorkUnit>(1);
        let result = WorkerBuilder::new(0)
            .queue(rx)
            .signals(Arc::new(RunSignals::new()))
            .settings(settings())
            .build();

        let err = result.unwrap_err();
        assert!(err.message.contains("client"));
    }

    #[test]
    fn test_builder_missing_everything() {
        let err = WorkerBuilder::new(0).build().unwrap_err();
        assert_eq!(err.kind, crate::error::BenchErrorKind::Config);
    }
}
