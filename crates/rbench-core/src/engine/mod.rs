use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;

use crate::error::RbenchError;
use crate::http::Probe;
use crate::results::LoadTestResult;

pub mod aggregator;
pub mod worker;

pub use aggregator::{percentile, percentile_sorted, LatencySample, LatencyStats, SampleAggregator};
pub use worker::{run_worker, LiveCounters};

/// Default idempotent, read-only path hammered by the load test.
pub const DEFAULT_PROBE_PATH: &str = "/health";

/// Configuration for one load-test run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTestConfig {
    /// Number of concurrent workers. Must be at least 1.
    pub concurrency: u32,
    /// Wall-clock window during which workers may start new requests.
    pub duration: Duration,
    pub probe_path: String,
    /// Interval between progress log lines.
    pub progress_interval: Duration,
}

impl LoadTestConfig {
    pub fn new(concurrency: u32, duration: Duration) -> Self {
        Self {
            concurrency,
            duration,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            progress_interval: Duration::from_secs(1),
        }
    }

    pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<(), RbenchError> {
        if self.concurrency < 1 {
            return Err(RbenchError::Validation(
                "Load test concurrency must be at least 1".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(RbenchError::Validation(
                "Load test duration must be greater than zero".to_string(),
            ));
        }
        if self.probe_path.is_empty() {
            return Err(RbenchError::Validation(
                "Load test probe path must not be empty".to_string(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(RbenchError::Validation(
                "Load test progress interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run a load test: `concurrency` workers issue the probe path until the
/// configured duration elapses, then the population is summarised.
pub async fn run_load_test<P>(
    probe: Arc<P>,
    config: &LoadTestConfig,
) -> Result<LoadTestResult, RbenchError>
where
    P: Probe + ?Sized + 'static,
{
    run_load_test_with_cancel(probe, config, CancellationToken::new()).await
}

/// Like [`run_load_test`], but `parent` may end the window early (e.g. on
/// Ctrl-C). Cancelling `parent` never aborts an in-flight request.
pub async fn run_load_test_with_cancel<P>(
    probe: Arc<P>,
    config: &LoadTestConfig,
    parent: CancellationToken,
) -> Result<LoadTestResult, RbenchError>
where
    P: Probe + ?Sized + 'static,
{
    config.validate()?;

    tracing::info!(
        concurrency = config.concurrency,
        duration_ms = config.duration.as_millis() as u64,
        path = %config.probe_path,
        "starting load test"
    );

    let cancel = parent.child_token();
    let counters = Arc::new(LiveCounters::default());
    let path: Arc<str> = Arc::from(config.probe_path.as_str());
    let started = Instant::now();

    // Deadline: cancel the run token once the window closes.
    let deadline_cancel = cancel.clone();
    let window = config.duration;
    let deadline_task = tokio::spawn(async move {
        tokio::select! {
            _ = sleep(window) => deadline_cancel.cancel(),
            _ = deadline_cancel.cancelled() => {}
        }
    });

    let mut workers: JoinSet<Vec<LatencySample>> = JoinSet::new();
    for worker_id in 0..config.concurrency {
        workers.spawn(run_worker(
            worker_id,
            Arc::clone(&probe),
            Arc::clone(&path),
            cancel.clone(),
            Arc::clone(&counters),
        ));
    }

    // One debug progress line per interval until the window closes.
    let reporter_counters = Arc::clone(&counters);
    let reporter_cancel = cancel.clone();
    let progress_every = config.progress_interval;
    let progress_task = tokio::spawn(async move {
        let mut ticker = interval(progress_every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!(
                        completed = reporter_counters.completed(),
                        failed = reporter_counters.failed(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "load test progress"
                    );
                }
                _ = reporter_cancel.cancelled() => break,
            }
        }
    });

    // Join barrier: every worker observes the token and exits on its own.
    let mut aggregator = SampleAggregator::new();
    let mut join_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(samples) => aggregator.merge(samples),
            Err(e) => {
                tracing::error!("load worker terminated abnormally: {e}");
                cancel.cancel();
                join_error.get_or_insert(e);
            }
        }
    }
    let actual_elapsed = started.elapsed();

    cancel.cancel();
    progress_task.abort();
    deadline_task.abort();

    if let Some(e) = join_error {
        return Err(RbenchError::Engine(format!("load worker failed: {e}")));
    }
    if parent.is_cancelled() {
        tracing::warn!(
            elapsed_ms = actual_elapsed.as_millis() as u64,
            "load test cancelled before the configured duration"
        );
    }

    let result = aggregator.finish(config.concurrency, config.duration, actual_elapsed);
    tracing::info!(
        total = result.total_requests,
        failed = result.failed,
        rps = result.rps,
        p95_ms = result.latency_p95_ms,
        "load test finished"
    );
    Ok(result)
}
