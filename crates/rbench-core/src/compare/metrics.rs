use serde::{Deserialize, Serialize};

use crate::compare::delta::{compute_delta, Delta, DeltaTolerances, MetricKind};
use crate::results::BenchmarkRun;

/// Run-record section a metric is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Connectivity,
    Health,
    Frontend,
    LoadTest,
    BenchmarkApi,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::Connectivity => "Connectivity",
            Section::Health => "Health",
            Section::Frontend => "Frontend",
            Section::LoadTest => "Load Test",
            Section::BenchmarkApi => "Benchmark API",
        }
    }
}

/// Single-valued metrics compared first-to-last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarMetric {
    DnsMs,
    TcpMs,
    TlsMs,
    ConnectTotalMs,
    HealthResponseMs,
    FrontendTotalSizeKb,
    FrontendTotalTimeMs,
    Rps,
    MinLatencyMs,
    P50LatencyMs,
    P95LatencyMs,
    P99LatencyMs,
    MaxLatencyMs,
    AvgLatencyMs,
    BenchmarkApiTotalMs,
}

impl ScalarMetric {
    /// Report order.
    pub const ALL: [ScalarMetric; 15] = [
        ScalarMetric::DnsMs,
        ScalarMetric::TcpMs,
        ScalarMetric::TlsMs,
        ScalarMetric::ConnectTotalMs,
        ScalarMetric::HealthResponseMs,
        ScalarMetric::FrontendTotalSizeKb,
        ScalarMetric::FrontendTotalTimeMs,
        ScalarMetric::Rps,
        ScalarMetric::MinLatencyMs,
        ScalarMetric::P50LatencyMs,
        ScalarMetric::P95LatencyMs,
        ScalarMetric::P99LatencyMs,
        ScalarMetric::MaxLatencyMs,
        ScalarMetric::AvgLatencyMs,
        ScalarMetric::BenchmarkApiTotalMs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScalarMetric::DnsMs => "DNS",
            ScalarMetric::TcpMs => "TCP",
            ScalarMetric::TlsMs => "TLS",
            ScalarMetric::ConnectTotalMs => "Total",
            ScalarMetric::HealthResponseMs => "Response",
            ScalarMetric::FrontendTotalSizeKb => "Total size",
            ScalarMetric::FrontendTotalTimeMs => "Total time",
            ScalarMetric::Rps => "RPS",
            ScalarMetric::MinLatencyMs => "Min latency",
            ScalarMetric::P50LatencyMs => "P50 latency",
            ScalarMetric::P95LatencyMs => "P95 latency",
            ScalarMetric::P99LatencyMs => "P99 latency",
            ScalarMetric::MaxLatencyMs => "Max latency",
            ScalarMetric::AvgLatencyMs => "Avg latency",
            ScalarMetric::BenchmarkApiTotalMs => "Total duration",
        }
    }

    pub fn section(self) -> Section {
        use ScalarMetric::*;
        match self {
            DnsMs | TcpMs | TlsMs | ConnectTotalMs => Section::Connectivity,
            HealthResponseMs => Section::Health,
            FrontendTotalSizeKb | FrontendTotalTimeMs => Section::Frontend,
            Rps | MinLatencyMs | P50LatencyMs | P95LatencyMs | P99LatencyMs | MaxLatencyMs
            | AvgLatencyMs => Section::LoadTest,
            BenchmarkApiTotalMs => Section::BenchmarkApi,
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            ScalarMetric::FrontendTotalSizeKb => MetricKind::Size,
            ScalarMetric::Rps => MetricKind::Throughput,
            _ => MetricKind::Time,
        }
    }

    /// The metric's value in `run`, or `None` when the section is absent.
    pub fn extract(self, run: &BenchmarkRun) -> Option<f64> {
        use ScalarMetric::*;
        match self {
            DnsMs => run.connectivity.as_ref().map(|c| c.dns_ms),
            TcpMs => run.connectivity.as_ref().map(|c| c.tcp_ms),
            TlsMs => run.connectivity.as_ref().and_then(|c| c.tls_ms),
            ConnectTotalMs => run.connectivity.as_ref().map(|c| c.total_ms),
            HealthResponseMs => run.health.as_ref().map(|h| h.response_ms),
            FrontendTotalSizeKb => run.frontend.as_ref().map(|f| f.total_size_kb),
            FrontendTotalTimeMs => run.frontend.as_ref().map(|f| f.total_time_ms),
            Rps => run.load_test.as_ref().map(|l| l.rps),
            MinLatencyMs => run.load_test.as_ref().map(|l| l.min_latency_ms),
            P50LatencyMs => run.load_test.as_ref().map(|l| l.latency_p50_ms),
            P95LatencyMs => run.load_test.as_ref().map(|l| l.latency_p95_ms),
            P99LatencyMs => run.load_test.as_ref().map(|l| l.latency_p99_ms),
            MaxLatencyMs => run.load_test.as_ref().map(|l| l.max_latency_ms),
            AvgLatencyMs => run.load_test.as_ref().map(|l| l.avg_latency_ms),
            BenchmarkApiTotalMs => run.benchmark_api.as_ref().map(|b| b.total_duration_ms),
        }
    }
}

/// Load-test figures shown per run without a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoMetric {
    Concurrency,
    DurationSec,
    TotalRequests,
    Successful,
    Failed,
    SuccessRatePct,
}

impl InfoMetric {
    pub const ALL: [InfoMetric; 6] = [
        InfoMetric::Concurrency,
        InfoMetric::DurationSec,
        InfoMetric::TotalRequests,
        InfoMetric::Successful,
        InfoMetric::Failed,
        InfoMetric::SuccessRatePct,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InfoMetric::Concurrency => "Concurrency",
            InfoMetric::DurationSec => "Duration (s)",
            InfoMetric::TotalRequests => "Total requests",
            InfoMetric::Successful => "Successful",
            InfoMetric::Failed => "Failed",
            InfoMetric::SuccessRatePct => "Success rate (%)",
        }
    }

    pub fn extract(self, run: &BenchmarkRun) -> Option<f64> {
        let load = run.load_test.as_ref()?;
        match self {
            InfoMetric::Concurrency => Some(f64::from(load.concurrent)),
            InfoMetric::DurationSec => Some(load.duration_sec),
            InfoMetric::TotalRequests => Some(load.total_requests as f64),
            InfoMetric::Successful => Some(load.successful as f64),
            InfoMetric::Failed => Some(load.failed as f64),
            InfoMetric::SuccessRatePct => load.success_rate_pct(),
        }
    }
}

/// One metric across all compared runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub section: Section,
    pub label: String,
    /// `None` for informational rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MetricKind>,
    /// One entry per run, oldest first; `None` where the run lacks the value.
    pub values: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
}

impl MetricRow {
    pub fn scalar(metric: ScalarMetric, runs: &[BenchmarkRun], tolerances: &DeltaTolerances) -> Self {
        let values: Vec<Option<f64>> = runs.iter().map(|r| metric.extract(r)).collect();
        let delta = first_last_delta(&values, metric.kind(), tolerances);
        Self {
            section: metric.section(),
            label: metric.label().to_string(),
            kind: Some(metric.kind()),
            values,
            delta,
        }
    }

    pub fn info(metric: InfoMetric, runs: &[BenchmarkRun]) -> Self {
        Self {
            section: Section::LoadTest,
            label: metric.label().to_string(),
            kind: None,
            values: runs.iter().map(|r| metric.extract(r)).collect(),
            delta: None,
        }
    }

    /// True when no run carries a value for this row.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Delta between the first and last values, only when both are present.
pub(crate) fn first_last_delta(
    values: &[Option<f64>],
    kind: MetricKind,
    tolerances: &DeltaTolerances,
) -> Option<Delta> {
    let first = (*values.first()?)?;
    let last = (*values.last()?)?;
    Some(compute_delta(first, last, kind, tolerances))
}
