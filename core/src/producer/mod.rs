//! Producer: feeds the shared work queue and drives a run
//!
//! The [`Manager`] pulls `(id, content)` items from a lazy source, groups them
//! into work units, enqueues them under backpressure and runs the worker pool
//! from start to report. A [`CancelHandle`] (wired to Ctrl+C by
//! [`Manager::run_with_signal_handling`]) interrupts it.
//!
//! # Example
//!
//! ```ignore
//! use osbench_core::{Manager, RunConfig, TaskKind};
//!
//! let config = RunConfig::new("docs", TaskKind::Ingest).with_workers(8);
//! let mut manager = Manager::new(config, client)?.with_progress(true);
//! let report = manager.run_with_signal_handling(source, Some(100_000)).await?;
//! println!("{} items/s", report.throughput);
//! ```

mod manager;
mod progress;
mod signal;

pub use manager::Manager;
pub use progress::{estimate_eta, format_eta, ProgressTracker};
pub use signal::{exit_on_interrupt, spawn_interrupt_listener, CancelHandle};
