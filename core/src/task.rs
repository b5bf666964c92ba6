//! Task kinds a run can execute

use std::sync::Arc;

use crate::config::{RunConfig, TaskKind};
use crate::error::BenchResult;
use crate::producer::Manager;
use crate::request::SourceItem;
use crate::runner::AggregateReport;
use crate::traits::TargetClient;

/// How a task is driven
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Draw a progress bar
    pub progress: bool,
    /// Turn Ctrl+C into a forced stop for the duration of the run
    pub handle_interrupt: bool,
}

/// A load task bound to its run configuration
///
/// The variant decides how the source is turned into work units; the task
/// kind stored in the configuration is overwritten to match it.
#[derive(Debug, Clone)]
pub enum BenchTask {
    /// Bulk-index documents
    Ingest(RunConfig),
    /// Send one query per source item
    Search(RunConfig),
}

impl BenchTask {
    /// Pick the variant named by `config.task`
    pub fn from_config(config: RunConfig) -> Self {
        match config.task {
            TaskKind::Ingest => BenchTask::Ingest(config),
            TaskKind::Search => BenchTask::Search(config),
        }
    }

    /// Task kind of this variant
    pub fn kind(&self) -> TaskKind {
        match self {
            BenchTask::Ingest(_) => TaskKind::Ingest,
            BenchTask::Search(_) => TaskKind::Search,
        }
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        match self {
            BenchTask::Ingest(config) | BenchTask::Search(config) => config,
        }
    }

    /// Run the task over `source` against `client`
    pub async fn execute<I>(
        &self,
        client: Arc<dyn TargetClient>,
        source: I,
        total_count: Option<usize>,
        options: ExecuteOptions,
    ) -> BenchResult<AggregateReport>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        let mut config = self.config().clone();
        config.task = self.kind();

        tracing::info!(
            task = %config.task,
            collection = %config.collection,
            client = client.name(),
            "Executing task"
        );

        let mut manager = Manager::new(config, client)?.with_progress(options.progress);
        if options.handle_interrupt {
            manager
                .run_with_signal_handling(source, total_count)
                .await
        } else {
            manager.run(source, total_count).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecycleConfig;
    use crate::test_support::{documents, Call, ScriptedClient};

    #[test]
    fn test_from_config_selects_variant() {
        let task = BenchTask::from_config(RunConfig::new("docs", TaskKind::Search));
        assert!(matches!(task, BenchTask::Search(_)));
        assert_eq!(task.kind(), TaskKind::Search);
        assert_eq!(task.config().collection, "docs");
    }

    #[tokio::test]
    async fn test_variant_overrides_config_task() {
        let client = Arc::new(ScriptedClient::new());
        // config says ingest, the variant says search
        let config = RunConfig::new("docs", TaskKind::Ingest)
            .with_workers(1)
            .with_timing(LifecycleConfig::fast());
        let task = BenchTask::Search(config);

        let report = task
            .execute(client.clone(), documents(3), Some(3), ExecuteOptions::default())
            .await
            .unwrap();

        assert_eq!(report.total_success, 3);
        assert_eq!(client.calls(), vec![Call::Query, Call::Query, Call::Query]);
    }

    #[tokio::test]
    async fn test_ingest_execute() {
        let client = Arc::new(ScriptedClient::new());
        let config = RunConfig::new("docs", TaskKind::Ingest)
            .with_workers(2)
            .with_batch_size(5)
            .with_timing(LifecycleConfig::fast());

        let report = BenchTask::from_config(config)
            .execute(client.clone(), documents(12), None, ExecuteOptions::default())
            .await
            .unwrap();

        assert_eq!(report.total_produced, 12);
        assert_eq!(report.total_success, 12);
        assert_eq!(client.calls().len(), 3);
    }
}
