//! Latency statistics and percentile calculation
//!
//! Percentiles use nearest-rank indexing: `sorted[floor(p * n)]`, clamped to
//! the last element, with samples of zero or one element falling back to the
//! first element.

use serde::{Deserialize, Serialize};

/// Summary of a latency sample (all values in milliseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean value
    pub avg: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl LatencyStats {
    /// Calculate statistics from raw samples
    ///
    /// An empty sample is treated as a single zero sample.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = if values.is_empty() {
            vec![0.0]
        } else {
            values.to_vec()
        };
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let len = sorted.len();
        Self {
            avg: sorted.iter().sum::<f64>() / len as f64,
            min: sorted[0],
            max: sorted[len - 1],
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
        }
    }

    /// Statistics over a multiset where each `value` occurs `weight` times
    ///
    /// Used to merge per-worker averages weighted by request count without
    /// materialising the replicated sample. Entries with zero weight or a zero
    /// value are ignored; nothing left yields all zeros.
    pub fn from_weighted(entries: &[(f64, u64)]) -> Self {
        let mut kept: Vec<(f64, u64)> = entries
            .iter()
            .copied()
            .filter(|&(value, weight)| weight > 0 && value > 0.0)
            .collect();
        if kept.is_empty() {
            return Self::default();
        }
        kept.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total: u64 = kept.iter().map(|&(_, w)| w).sum();
        let weighted_sum: f64 = kept.iter().map(|&(v, w)| v * w as f64).sum();

        Self {
            avg: weighted_sum / total as f64,
            min: kept[0].0,
            max: kept[kept.len() - 1].0,
            p50: weighted_percentile(&kept, total, 0.50),
            p95: weighted_percentile(&kept, total, 0.95),
            p99: weighted_percentile(&kept, total, 0.99),
        }
    }
}

/// Rank of percentile `p` in a sample of `n` elements
fn rank(n: u64, p: f64) -> u64 {
    if n <= 1 {
        return 0;
    }
    ((p * n as f64).floor() as u64).min(n - 1)
}

/// Nearest-rank percentile of an already sorted, non-empty sample
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted[rank(sorted.len() as u64, p) as usize]
}

fn weighted_percentile(sorted: &[(f64, u64)], total: u64, p: f64) -> f64 {
    let target = rank(total, p);
    let mut seen = 0u64;
    for &(value, weight) in sorted {
        seen += weight;
        if seen > target {
            return value;
        }
    }
    sorted.last().map(|&(v, _)| v).unwrap_or(0.0)
}
