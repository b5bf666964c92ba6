//! Channel configuration for runner communication

/// Channel buffer configuration for the results path (workers -> runner)
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Results channel buffer size
    pub results_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { results_buffer: 64 }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom results buffer size
    pub fn with_results_buffer(mut self, size: usize) -> Self {
        self.results_buffer = size;
        self
    }

    /// Buffer size actually used for a pool of `workers`
    ///
    /// Never smaller than the pool, so every worker can deliver its summary
    /// without blocking even when nobody is collecting yet.
    pub fn effective_results_buffer(&self, workers: usize) -> usize {
        self.results_buffer.max(workers).max(1)
    }
}
