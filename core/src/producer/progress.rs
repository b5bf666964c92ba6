//! Producer progress reporting

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Items between two status updates
const REPORT_EVERY: usize = 1000;

/// Remaining time at the throughput observed so far
///
/// `None` when the total is unknown or nothing has been produced yet.
pub fn estimate_eta(done: usize, total: Option<usize>, elapsed: Duration) -> Option<Duration> {
    let total = total?;
    if done >= total {
        return Some(Duration::ZERO);
    }
    let secs = elapsed.as_secs_f64();
    if done == 0 || secs <= 0.0 {
        return None;
    }
    let rate = done as f64 / secs;
    Some(Duration::from_secs_f64((total - done) as f64 / rate))
}

/// Compact human form: `45s`, `3m07s`, `2h05m`
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Progress of one production run
///
/// Draws an indicatif bar when enabled; otherwise status goes to the log.
/// [`ProgressTracker::start`] resets the timer, so every run measures its own
/// throughput.
#[derive(Debug)]
pub struct ProgressTracker {
    enabled: bool,
    bar: ProgressBar,
    started: Instant,
    total: Option<usize>,
    done: usize,
}

impl ProgressTracker {
    /// Create a tracker; `enabled` selects the terminal bar
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: ProgressBar::hidden(),
            started: Instant::now(),
            total: None,
            done: 0,
        }
    }

    /// Begin a run with an optional total item count
    pub fn start(&mut self, total: Option<usize>) {
        self.started = Instant::now();
        self.total = total;
        self.done = 0;

        self.bar = if !self.enabled {
            ProgressBar::hidden()
        } else if let Some(total) = total {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} items {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar
        };
    }

    /// Record `n` more items pulled from the source
    pub fn advance(&mut self, n: usize) {
        let before = self.done / REPORT_EVERY;
        self.done += n;
        self.bar.set_position(self.done as u64);

        if self.done / REPORT_EVERY > before {
            self.report();
        }
    }

    /// Items recorded so far in this run
    pub fn done(&self) -> usize {
        self.done
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Items per second since the run started
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.done as f64 / secs
        } else {
            0.0
        }
    }

    /// Current ETA, if it can be estimated
    pub fn eta(&self) -> Option<Duration> {
        estimate_eta(self.done, self.total, self.elapsed())
    }

    /// Close the bar with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn report(&self) {
        let eta = self
            .eta()
            .map(format_eta)
            .unwrap_or_else(|| "unknown".to_string());
        let rate = self.throughput();

        if self.enabled {
            self.bar.set_message(format!("{rate:.0} items/s, ETA {eta}"));
        } else {
            tracing::info!(
                produced = self.done,
                total = ?self.total,
                rate = format!("{rate:.1}"),
                eta = %eta,
                "Producer progress"
            );
        }
    }
}
