use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RbenchError;
use crate::results::BenchmarkRun;

/// Alerting limits applied to every run. Missing fields in a JSON file take
/// their default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub latency_p95_max_ms: f64,
    pub latency_p99_max_ms: f64,
    pub error_rate_max_pct: f64,
    pub rps_min: f64,
    pub health_response_max_ms: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            latency_p95_max_ms: 500.0,
            latency_p99_max_ms: 1000.0,
            error_rate_max_pct: 1.0,
            rps_min: 10.0,
            health_response_max_ms: 100.0,
        }
    }
}

impl ThresholdConfig {
    /// Load limits from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RbenchError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RbenchError> {
        let limits = [
            ("latency_p95_max_ms", self.latency_p95_max_ms),
            ("latency_p99_max_ms", self.latency_p99_max_ms),
            ("error_rate_max_pct", self.error_rate_max_pct),
            ("rps_min", self.rps_min),
            ("health_response_max_ms", self.health_response_max_ms),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(RbenchError::Validation(format!(
                    "Threshold {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// The rule an alert was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    HealthResponse,
    LatencyP95,
    LatencyP99,
    ErrorRate,
    Rps,
}

impl std::fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertMetric::HealthResponse => "health response time",
            AlertMetric::LatencyP95 => "P95 latency",
            AlertMetric::LatencyP99 => "P99 latency",
            AlertMetric::ErrorRate => "error rate",
            AlertMetric::Rps => "RPS",
        };
        write!(f, "{s}")
    }
}

/// A single run breaking a single limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAlert {
    /// Position of the run in the chronologically ordered input.
    pub run_index: usize,
    pub timestamp: DateTime<Utc>,
    pub metric: AlertMetric,
    pub observed: f64,
    pub threshold: f64,
}

impl std::fmt::Display for ThresholdAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (cmp, unit) = match self.metric {
            AlertMetric::Rps => ("<", " req/s"),
            AlertMetric::ErrorRate => (">", "%"),
            _ => (">", "ms"),
        };
        write!(
            f,
            "run {} ({}): {} {:.2}{unit} {cmp} {:.2}{unit}",
            self.run_index + 1,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.metric,
            self.observed,
            self.threshold,
        )
    }
}

/// Check every run against every rule.
///
/// Alerts come out run by run, and within one run in rule order: health,
/// p95, p99, error rate, RPS. A run lacking the section a rule reads is
/// skipped for that rule.
pub fn evaluate_thresholds(runs: &[BenchmarkRun], config: &ThresholdConfig) -> Vec<ThresholdAlert> {
    let mut alerts = Vec::new();
    for (run_index, run) in runs.iter().enumerate() {
        let mut raise = |metric, observed, threshold| {
            alerts.push(ThresholdAlert {
                run_index,
                timestamp: run.timestamp,
                metric,
                observed,
                threshold,
            });
        };

        if let Some(health) = &run.health {
            if health.response_ms > config.health_response_max_ms {
                raise(
                    AlertMetric::HealthResponse,
                    health.response_ms,
                    config.health_response_max_ms,
                );
            }
        }

        let Some(load) = &run.load_test else {
            continue;
        };
        if load.latency_p95_ms > config.latency_p95_max_ms {
            raise(AlertMetric::LatencyP95, load.latency_p95_ms, config.latency_p95_max_ms);
        }
        if load.latency_p99_ms > config.latency_p99_max_ms {
            raise(AlertMetric::LatencyP99, load.latency_p99_ms, config.latency_p99_max_ms);
        }
        if let Some(rate) = load.error_rate_pct() {
            if rate > config.error_rate_max_pct {
                raise(AlertMetric::ErrorRate, rate, config.error_rate_max_pct);
            }
        }
        if load.rps < config.rps_min {
            raise(AlertMetric::Rps, load.rps, config.rps_min);
        }
    }

    if !alerts.is_empty() {
        tracing::debug!(count = alerts.len(), "threshold alerts raised");
    }
    alerts
}
