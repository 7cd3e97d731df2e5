use std::time::Duration;

use crate::results::LoadTestResult;

// ---------------------------------------------------------------------------
// LatencySample: outcome of one request
// ---------------------------------------------------------------------------

/// One request's elapsed time and success flag. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySample {
    elapsed_ms: f64,
    success: bool,
}

impl LatencySample {
    pub fn new(elapsed: Duration, success: bool) -> Self {
        Self {
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            success,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

// ---------------------------------------------------------------------------
// Percentiles
// ---------------------------------------------------------------------------

/// The `p`-th percentile (`p` in `[0, 100]`) of an unordered collection,
/// using linear interpolation between order statistics.
///
/// Returns 0 for an empty collection. `percentile(x, 0.0)` is the minimum
/// and `percentile(x, 100.0)` the maximum.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// [`percentile`] over an already ascending-sorted slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }
    let idx = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let w = idx - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Order statistics over one population of latencies (ms).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    /// Sorts `latencies` in place once, then reads every statistic from it.
    /// All fields are 0 when there are no samples.
    pub fn compute(latencies: &mut [f64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }
        latencies.sort_by(f64::total_cmp);
        let sum: f64 = latencies.iter().sum();
        Self {
            min_ms: latencies[0],
            max_ms: latencies[latencies.len() - 1],
            avg_ms: sum / latencies.len() as f64,
            p50_ms: percentile_sorted(latencies, 50.0),
            p95_ms: percentile_sorted(latencies, 95.0),
            p99_ms: percentile_sorted(latencies, 99.0),
        }
    }
}

// ---------------------------------------------------------------------------
// SampleAggregator: merges worker buffers into a LoadTestResult
// ---------------------------------------------------------------------------

/// Collects the per-worker sample buffers after join and produces the final
/// [`LoadTestResult`]. Samples are discarded once summarised.
#[derive(Debug, Default)]
pub struct SampleAggregator {
    samples: Vec<LatencySample>,
}

impl SampleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one worker's buffer.
    pub fn merge(&mut self, worker_samples: Vec<LatencySample>) {
        if self.samples.is_empty() {
            self.samples = worker_samples;
        } else {
            self.samples.extend(worker_samples);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Build the result. `actual_elapsed` is the wall-clock time from pool
    /// start until the last worker exited; RPS is computed against it.
    pub fn finish(
        self,
        concurrency: u32,
        configured: Duration,
        actual_elapsed: Duration,
    ) -> LoadTestResult {
        let total = self.samples.len() as u64;
        let successful = self.samples.iter().filter(|s| s.success).count() as u64;
        let failed = total - successful;

        let mut latencies: Vec<f64> = self.samples.into_iter().map(|s| s.elapsed_ms).collect();
        let stats = LatencyStats::compute(&mut latencies);

        let elapsed_secs = actual_elapsed.as_secs_f64();
        let rps = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        LoadTestResult {
            concurrent: concurrency,
            duration_sec: configured.as_secs_f64(),
            total_requests: total,
            successful,
            failed,
            rps,
            latency_p50_ms: stats.p50_ms,
            latency_p95_ms: stats.p95_ms,
            latency_p99_ms: stats.p99_ms,
            min_latency_ms: stats.min_ms,
            max_latency_ms: stats.max_ms,
            avg_latency_ms: stats.avg_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
