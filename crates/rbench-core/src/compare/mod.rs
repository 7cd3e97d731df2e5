//! Multi-run comparison: first-vs-last deltas per metric, per-key
//! reconciliation of endpoint, asset and operation collections, and
//! per-run threshold alerts.

pub mod delta;
pub mod keyed;
pub mod metrics;
pub mod thresholds;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RbenchError;
use crate::results::{BenchmarkRun, OverallStatus};

pub use delta::{compute_delta, Delta, DeltaKind, DeltaTolerances, MetricKind};
pub use keyed::{reconcile, union_keys, KeyedGroup, KeyedRow};
pub use metrics::{InfoMetric, MetricRow, ScalarMetric, Section};
pub use thresholds::{evaluate_thresholds, AlertMetric, ThresholdAlert, ThresholdConfig};

/// Identity of one compared run, in the order of the value columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub version: String,
    pub overall: OverallStatus,
}

impl From<&BenchmarkRun> for RunSummary {
    fn from(run: &BenchmarkRun) -> Self {
        Self {
            timestamp: run.timestamp,
            target: run.target.clone(),
            version: run.version.clone(),
            overall: run.overall,
        }
    }
}

/// Everything a renderer needs. Rebuilt on every comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub runs: Vec<RunSummary>,
    pub metric_rows: Vec<MetricRow>,
    pub keyed_rows: Vec<KeyedRow>,
    pub alerts: Vec<ThresholdAlert>,
}

impl ComparisonReport {
    pub fn regressions(&self) -> impl Iterator<Item = &Delta> {
        self.metric_rows
            .iter()
            .filter_map(|r| r.delta.as_ref())
            .chain(self.keyed_rows.iter().filter_map(|r| r.delta.as_ref()))
            .filter(|d| d.kind == DeltaKind::Regression)
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Compare chronologically ordered `runs`.
///
/// Requires at least two runs. Metric rows whose value is absent from every
/// run are left out.
pub fn compare_runs(
    runs: &[BenchmarkRun],
    thresholds: &ThresholdConfig,
    tolerances: &DeltaTolerances,
) -> Result<ComparisonReport, RbenchError> {
    if runs.len() < 2 {
        return Err(RbenchError::InsufficientRuns { found: runs.len() });
    }

    let mut metric_rows: Vec<MetricRow> = ScalarMetric::ALL
        .iter()
        .map(|&m| MetricRow::scalar(m, runs, tolerances))
        .filter(|row| !row.is_empty())
        .collect();
    metric_rows.extend(
        InfoMetric::ALL
            .iter()
            .map(|&m| MetricRow::info(m, runs))
            .filter(|row| !row.is_empty()),
    );

    let keyed_rows: Vec<KeyedRow> = KeyedGroup::ALL
        .iter()
        .flat_map(|&g| reconcile(g, runs, tolerances))
        .collect();

    let alerts = evaluate_thresholds(runs, thresholds);

    let report = ComparisonReport {
        runs: runs.iter().map(RunSummary::from).collect(),
        metric_rows,
        keyed_rows,
        alerts,
    };
    tracing::info!(
        runs = report.runs.len(),
        regressions = report.regressions().count(),
        alerts = report.alerts.len(),
        "comparison complete"
    );
    Ok(report)
}
