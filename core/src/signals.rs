//! Shared run signals between the runner and its workers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Ready counter and stop flag shared by one pool
///
/// Both values only move forward during a run. A new run gets a fresh
/// instance.
#[derive(Debug, Default)]
pub struct RunSignals {
    ready: AtomicUsize,
    stop: AtomicBool,
}

impl RunSignals {
    /// Fresh signals: nobody ready, no stop requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one worker as ready; returns the new ready count
    pub fn mark_ready(&self) -> usize {
        self.ready.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of workers that have started
    pub fn ready_count(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }

    /// Ask every worker to finish draining and exit
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
