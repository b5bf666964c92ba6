//! Runner: supervisor of the worker pool
//!
//! The Runner owns one pool for one run:
//! - Spawning workers on the shared work queue
//! - A ready barrier that degrades to "proceed anyway" on timeout
//! - Graceful (join, then abort stragglers) or forced (abort all) stop
//! - Collecting worker summaries into an [`AggregateReport`]
//!
//! # Example
//!
//! ```ignore
//! use osbench_core::RunnerBuilder;
//!
//! let mut runner = RunnerBuilder::new()
//!     .config(&config)
//!     .client(client)
//!     .queue(queue_rx)
//!     .build()?;
//!
//! runner.start(config.workers)?;
//! runner.wait_until_ready(config.timing.ready_timeout).await;
//! // ... feed the queue ...
//! runner.stop(false).await;
//! let report = runner.collect_metrics(config.timing.collect_timeout).await;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_summaries, AggregateReport};
pub use builder::RunnerBuilder;
pub use executor::Runner;

#[cfg(test)]
mod tests;
