//! Worker module for draining the shared work queue
//!
//! The Worker is the execution unit of osbench, responsible for the loop
//! **pull -> dispatch -> accumulate -> repeat**. Each Worker is a tokio task
//! that:
//!
//! 1. Marks itself ready on the shared ready counter
//! 2. Pulls the next work unit with a bounded wait
//! 3. Sends it to the target, retrying rejected bulk items locally
//! 4. Folds the outcome into its own [`WorkerStats`]
//! 5. Exits once a stop is requested and the queue is empty
//! 6. Hands its [`WorkerSummary`] to the runner exactly once
//!
//! Work units are never put back on the shared queue. A bulk unit with
//! rejected items is retried by the worker that pulled it, one attempt at a
//! time, and only the rejected operations are resent.
//!
//! # Example
//!
//! ```ignore
//! use osbench_core::worker::{WorkerBuilder, WorkerSettings};
//!
//! let worker = WorkerBuilder::new(0)
//!     .client(client)
//!     .queue(queue_rx)
//!     .results_tx(results_tx)
//!     .signals(signals)
//!     .settings(WorkerSettings::from_config(&config))
//!     .build()?;
//!
//! tokio::spawn(worker.run());
//! ```

mod builder;
mod executor;
mod rate_limiter;
mod retry;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::{Worker, WorkerSettings};
pub use rate_limiter::RequestRateLimiter;
pub use stats::{WorkerStats, WorkerSummary, MAX_RECORDED_ERRORS};
