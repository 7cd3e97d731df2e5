use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::engine::aggregator::LatencySample;
use crate::http::Probe;

/// Live counters shared by every worker, read only by the progress reporter.
#[derive(Debug, Default)]
pub struct LiveCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl LiveCounters {
    pub fn record(&self, success: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Run one load worker: issue `path` back to back until `cancel` fires.
///
/// The token is checked before every request, never mid-request, so a
/// request in flight at the deadline still completes and is recorded.
/// Samples accumulate in a buffer owned by this worker and are handed back
/// to the caller on exit.
pub async fn run_worker<P>(
    worker_id: u32,
    probe: Arc<P>,
    path: Arc<str>,
    cancel: CancellationToken,
    counters: Arc<LiveCounters>,
) -> Vec<LatencySample>
where
    P: Probe + ?Sized,
{
    let mut samples = Vec::new();

    while !cancel.is_cancelled() {
        let start = Instant::now();
        let outcome = probe.issue_request(&path).await;
        let sample = LatencySample::new(start.elapsed(), outcome.is_success());

        if let Some(err) = &outcome.error {
            tracing::trace!(worker_id, error = %err, "request failed");
        }
        counters.record(sample.is_success());
        samples.push(sample);

        // A probe that resolves without awaiting anything would starve the
        // timer task on a current-thread runtime.
        tokio::task::yield_now().await;
    }

    tracing::trace!(worker_id, requests = samples.len(), "worker stopped");
    samples
}
