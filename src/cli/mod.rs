//! CLI argument parsing and command handling

mod export;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use osbench_core::{
    exit_on_interrupt, BenchTask, ExecuteOptions, RunConfig, SourceItem, TaskKind,
};
use osbench_samplers::JsonLinesSource;
use osbench_vendors::{ClientConfig, OpenSearchClient, DEFAULT_URL};

pub use export::export_json;
pub use report::print_report;

/// osbench - load generator for OpenSearch-compatible services
#[derive(Parser, Debug)]
#[command(name = "osbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an ingest or search load test
    Run(RunArgs),
    /// Validate a run configuration file
    Validate {
        /// Path to the JSON run configuration
        #[arg(short, long)]
        config: PathBuf,
        /// Also check this source file and count its items
        #[arg(short, long)]
        docs: Option<PathBuf>,
    },
    /// Print cluster name and version
    Info(ConnectionArgs),
}

/// Where and how to connect
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Cluster URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Basic-auth user
    #[arg(long, env = "OPENSEARCH_USERNAME")]
    pub username: Option<String>,

    /// Basic-auth password
    #[arg(long, env = "OPENSEARCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "OPENSEARCH_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// Idle connections kept per host
    #[arg(long, default_value = "25")]
    pub pool_size: usize,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
}

impl ConnectionArgs {
    /// Client configuration for these arguments
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.url.clone())
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_pool_size(self.pool_size)
            .with_insecure(self.insecure);
        if self.username.is_some() || self.password.is_some() {
            config = config.with_credentials(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            );
        }
        config
    }

    fn connect(&self) -> Result<OpenSearchClient> {
        OpenSearchClient::new(self.client_config())
            .with_context(|| format!("Failed to create client for: {}", self.url))
    }
}

/// Arguments of `osbench run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON run configuration; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target index
    #[arg(short = 'i', long)]
    pub collection: Option<String>,

    /// Task kind (ingest, search)
    #[arg(short, long)]
    pub task: Option<TaskKind>,

    /// JSON-lines file with documents (ingest) or query bodies (search)
    #[arg(short, long)]
    pub docs: PathBuf,

    /// Items to send; the file is repeated until reached
    #[arg(short = 'n', long)]
    pub total: Option<usize>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Bounded work-queue capacity
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Documents per bulk request
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Retries of rejected bulk items
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Requests per second, per worker
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// Write the report as JSON to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl RunArgs {
    /// Merge the config file with flag overrides and validate
    pub fn resolve_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from: {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if let Some(task) = self.task {
            config.task = task;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(rps) = self.rate_limit {
            config.rate_limit = Some(rps);
        }

        config.validate().context("Invalid run configuration")?;
        Ok(config)
    }

    /// Open the source file: one pass, or cycled up to `--total`
    fn open_source(&self) -> Result<(Box<dyn Iterator<Item = SourceItem> + Send>, usize)> {
        let source = JsonLinesSource::open(&self.docs)
            .with_context(|| format!("Failed to open source: {}", self.docs.display()))?;

        match self.total {
            Some(total) => {
                let items = source.cycle(total).context("Failed to read source")?;
                Ok((Box::new(items), total))
            }
            None => {
                let total = source.count().context("Failed to count source items")?;
                let items = source.iter().context("Failed to read source")?;
                Ok((Box::new(items), total))
            }
        }
    }
}

impl Cli {
    /// Dispatch the parsed command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run(args).await,
            Commands::Validate { config, docs } => validate(config, docs),
            Commands::Info(connection) => info(connection).await,
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let client = args.connection.connect()?;

    match client.info().await {
        Ok(info) => tracing::info!(
            cluster = %info.cluster_name,
            version = %info.version.number,
            "Connected"
        ),
        Err(e) => tracing::warn!(error = %e, url = %args.connection.url, "Cluster info unavailable"),
    }

    let (items, total) = args.open_source()?;

    println!("\n{}", "=".repeat(70));
    println!("   osbench - {} load test", config.task);
    println!("{}", "=".repeat(70));
    println!("  Target:       {}/{}", client.config().base_url(), config.collection);
    println!("  Items:        {}", total);
    println!("  Workers:      {}", config.workers);
    if config.task.is_batched() {
        println!("  Batch size:   {}", config.batch_size);
    }
    println!("{}", "=".repeat(70));
    println!();

    let options = ExecuteOptions {
        progress: args.progress,
        handle_interrupt: true,
    };
    let report = BenchTask::from_config(config.clone())
        .execute(Arc::new(client), items, Some(total), options)
        .await;
    // the run's listener is gone but its SIGINT handler is not
    exit_on_interrupt();
    let report = report.context("Run failed")?;

    print_report(&report, &config);

    if let Some(path) = &args.output {
        export_json(&report, &config, path)
            .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
        println!("✓ JSON exported to: {}", path.display());
    }

    Ok(())
}

fn validate(path: PathBuf, docs: Option<PathBuf>) -> Result<()> {
    let config = RunConfig::from_json_file(&path)
        .with_context(|| format!("Failed to load config from: {}", path.display()))?;
    config.validate().context("Invalid run configuration")?;

    println!("✓ Configuration valid: {}", path.display());
    println!("  Collection:   {}", config.collection);
    println!("  Task:         {}", config.task);
    println!("  Workers:      {}", config.workers);

    if let Some(docs) = docs {
        let count = JsonLinesSource::open(&docs)
            .and_then(|source| source.count())
            .with_context(|| format!("Failed to read source: {}", docs.display()))?;
        println!("✓ Source readable: {} ({} items)", docs.display(), count);
    }

    Ok(())
}

async fn info(connection: ConnectionArgs) -> Result<()> {
    let client = connection.connect()?;
    let info = client
        .info()
        .await
        .with_context(|| format!("Failed to reach: {}", connection.url))?;

    println!("Cluster:      {}", info.cluster_name);
    println!("Version:      {}", info.version.number);
    if let Some(distribution) = info.version.distribution {
        println!("Distribution: {}", distribution);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("osbench").chain(args.iter().copied())).unwrap()
    }

    fn run_args(cli: Cli) -> RunArgs {
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_build_config() {
        let args = run_args(parse(&[
            "run", "-i", "docs", "--task", "search", "--docs", "q.jsonl", "-w", "8",
            "--rate-limit", "2.5",
        ]));
        let config = args.resolve_config().unwrap();

        assert_eq!(config.collection, "docs");
        assert_eq!(config.task, TaskKind::Search);
        assert_eq!(config.workers, 8);
        assert_eq!(config.rate_limit, Some(2.5));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"collection": "from-file", "task": "ingest", "workers": 2, "batch_size": 500}}"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = run_args(parse(&["run", "-c", &path, "--docs", "d.jsonl", "-w", "16"]));
        let config = args.resolve_config().unwrap();

        assert_eq!(config.collection, "from-file");
        assert_eq!(config.workers, 16);
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn test_missing_collection_rejected() {
        let args = run_args(parse(&["run", "--docs", "d.jsonl"]));
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_unknown_task_rejected() {
        let result = Cli::try_parse_from(["osbench", "run", "--docs", "d.jsonl", "--task", "delete"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_credentials() {
        let args = run_args(parse(&[
            "run", "--docs", "d.jsonl", "--url", "https://os:9200", "--username", "admin",
            "--password", "pw", "--timeout", "5",
        ]));
        let config = args.connection.client_config();

        assert_eq!(config.url, "https://os:9200");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_source_cycles_to_total() {
        let mut docs = tempfile::NamedTempFile::new().unwrap();
        writeln!(docs, r#"{{"text": "a"}}"#).unwrap();
        writeln!(docs, r#"{{"text": "b"}}"#).unwrap();

        let path = docs.path().to_str().unwrap().to_string();
        let args = run_args(parse(&["run", "-i", "docs", "--docs", &path, "-n", "5"]));
        let (items, total) = args.open_source().unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.count(), 5);

        let args = run_args(parse(&["run", "-i", "docs", "--docs", &path]));
        let (items, total) = args.open_source().unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.count(), 2);
    }
}
