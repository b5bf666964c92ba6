//! Builder pattern for Runner construction

use std::sync::Arc;

use crate::channel::ChannelConfig;
use crate::config::{LifecycleConfig, RunConfig};
use crate::error::{BenchError, BenchResult};
use crate::request::WorkUnit;
use crate::traits::TargetClient;
use crate::worker::WorkerSettings;

use super::executor::Runner;

/// Builder for creating a Runner with proper configuration
///
/// # Example
///
/// ```ignore
/// let mut runner = RunnerBuilder::new()
///     .config(&run_config)
///     .client(client)
///     .queue(queue_rx)
///     .build()?;
///
/// runner.start(run_config.workers)?;
/// ```
pub struct RunnerBuilder {
    settings: Option<WorkerSettings>,
    timing: LifecycleConfig,
    client: Option<Arc<dyn TargetClient>>,
    queue: Option<async_channel::Receiver<WorkUnit>>,
    channel_config: ChannelConfig,
}

impl RunnerBuilder {
    /// Create a new runner builder with default timing
    pub fn new() -> Self {
        Self {
            settings: None,
            timing: LifecycleConfig::default(),
            client: None,
            queue: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Take worker settings and timing from a run configuration
    pub fn config(mut self, config: &RunConfig) -> Self {
        self.settings = Some(WorkerSettings::from_config(config));
        self.timing = config.timing.clone();
        self
    }

    /// Set the worker settings directly
    pub fn settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the lifecycle timeouts
    pub fn timing(mut self, timing: LifecycleConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set the target client
    pub fn client(mut self, client: Arc<dyn TargetClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the consumer side of the work queue
    pub fn queue(mut self, queue: async_channel::Receiver<WorkUnit>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set channel buffer configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the Runner
    ///
    /// # Errors
    /// Returns an error if the client, queue or settings are missing.
    pub fn build(self) -> BenchResult<Runner> {
        let client = self.client.ok_or_else(|| BenchError::missing_config("client"))?;
        let queue = self.queue.ok_or_else(|| BenchError::missing_config("queue"))?;
        let settings = self
            .settings
            .ok_or_else(|| BenchError::missing_config("settings"))?;

        Ok(Runner::new(
            client,
            queue,
            settings,
            self.timing,
            self.channel_config,
        ))
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
