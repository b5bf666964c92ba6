//! Run configuration types

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kind of load a run generates
///
/// Selects both how the producer batches source items and how a worker
/// dispatches the resulting work units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Bulk writes: items are grouped into batches of `batch_size`
    #[default]
    Ingest,
    /// Queries: every item is sent on its own
    Search,
}

impl TaskKind {
    /// Whether source items are grouped into multi-item work units
    pub fn is_batched(&self) -> bool {
        matches!(self, TaskKind::Ingest)
    }

    /// Identifier used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Ingest => "ingest",
            TaskKind::Search => "search",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingest" | "bulk" => Ok(TaskKind::Ingest),
            "search" | "query" => Ok(TaskKind::Search),
            other => Err(ConfigError::InvalidTask(other.to_string())),
        }
    }
}

/// Timeouts and polling intervals governing the run lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long the runner waits for every worker to report ready
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,

    /// Per-worker join timeout during a graceful stop
    #[serde(with = "humantime_serde")]
    pub join_timeout: Duration,

    /// How long metric collection waits for missing workers
    #[serde(with = "humantime_serde")]
    pub collect_timeout: Duration,

    /// Bounded wait of a single dequeue attempt
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,

    /// Pause after an empty dequeue before re-checking the stop flag
    #[serde(with = "humantime_serde")]
    pub idle_backoff: Duration,

    /// Interval at which the manager checks whether the queue has drained
    #[serde(with = "humantime_serde")]
    pub drain_poll: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(5),
            collect_timeout: Duration::from_secs(2),
            poll_timeout: Duration::from_millis(500),
            idle_backoff: Duration::from_millis(100),
            drain_poll: Duration::from_millis(500),
        }
    }
}

impl LifecycleConfig {
    /// Short intervals suitable for tests and local dry runs
    pub fn fast() -> Self {
        Self {
            ready_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(2),
            collect_timeout: Duration::from_millis(500),
            poll_timeout: Duration::from_millis(20),
            idle_backoff: Duration::from_millis(5),
            drain_poll: Duration::from_millis(10),
        }
    }
}

/// Configuration of a single load run
///
/// Every option maps onto one knob of the pipeline: the queue capacity bounds
/// the work queue, `batch_size` sizes bulk work units, `max_retries` bounds
/// local retry per unit and `workers` sets the pool size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Target index/collection name
    pub collection: String,

    /// Write or query load
    pub task: TaskKind,

    /// Number of parallel workers
    pub workers: usize,

    /// Fixed capacity of the shared work queue
    pub queue_capacity: usize,

    /// Items per bulk work unit
    pub batch_size: usize,

    /// Retry budget per bulk work unit
    pub max_retries: u32,

    /// Optional per-worker request rate (requests per second)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// Lifecycle timeouts
    pub timing: LifecycleConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            collection: String::new(),
            task: TaskKind::default(),
            workers: 4,
            queue_capacity: 100,
            batch_size: 100,
            max_retries: 3,
            rate_limit: None,
            timing: LifecycleConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a config for the given collection and task kind
    pub fn new(collection: impl Into<String>, task: TaskKind) -> Self {
        Self {
            collection: collection.into(),
            task,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the bulk batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-worker rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Replace the lifecycle timeouts
    pub fn with_timing(mut self, timing: LifecycleConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::MissingCollection);
        }

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "workers must be at least 1".into(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(
                "queue capacity must be at least 1".into(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(
                "batch size must be at least 1".into(),
            ));
        }

        if let Some(rps) = self.rate_limit {
            if rps <= 0.0 || !rps.is_finite() {
                return Err(ConfigError::InvalidRateLimit(
                    "rate limit must be positive".into(),
                ));
            }
        }

        if self.timing.poll_timeout.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "poll timeout must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No target collection given
    #[error("collection name is required")]
    MissingCollection,

    /// Unknown task kind
    #[error("Invalid task kind: {0} (expected ingest or search)")]
    InvalidTask(String),

    /// Invalid worker count
    #[error("Invalid workers: {0}")]
    InvalidWorkers(String),

    /// Invalid queue capacity
    #[error("Invalid queue capacity: {0}")]
    InvalidQueueCapacity(String),

    /// Invalid batch size
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid lifecycle timing
    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    /// Config file could not be parsed
    #[error("Invalid config file: {0}")]
    Parse(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
