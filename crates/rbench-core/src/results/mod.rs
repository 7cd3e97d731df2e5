pub mod io;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use io::{default_run_file_name, load_runs, read_runs, scan_directory, write_run, RawRun};

// ---------------------------------------------------------------------------
// BenchmarkRun: one historical measurement snapshot
// ---------------------------------------------------------------------------

/// One complete benchmark measurement snapshot.
///
/// Every section is optional: older or differently-configured runs may not
/// carry it. An absent section (`None`) means "not measured" and is never
/// read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkRun {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<ConnectivityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<EndpointResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<FrontendResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_test: Option<LoadTestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_api: Option<BenchmarkApiResult>,
    #[serde(default)]
    pub overall: OverallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkRun {
    /// An empty run for `target` stamped with the current time.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.into(),
            version: String::new(),
            connectivity: None,
            health: None,
            endpoints: None,
            frontend: None,
            load_test: None,
            benchmark_api: None,
            overall: OverallStatus::Pass,
            error: None,
        }
    }

    /// Response time of the endpoint at `path`, if this run measured it.
    pub fn endpoint_response_ms(&self, path: &str) -> Option<f64> {
        self.endpoints
            .as_deref()?
            .iter()
            .find(|ep| ep.path == path)
            .map(|ep| ep.response_ms)
    }

    /// Size and time of the frontend asset at `path`. The index document is
    /// addressed as [`INDEX_ASSET_KEY`].
    pub fn asset(&self, path: &str) -> Option<&AssetResult> {
        let frontend = self.frontend.as_ref()?;
        if path == INDEX_ASSET_KEY {
            if let Some(index) = &frontend.index_html {
                return Some(index);
            }
        }
        frontend.assets.iter().find(|a| a.path == path)
    }

    /// The server-side benchmark response, when the API call succeeded.
    pub fn benchmark_response(&self) -> Option<&BenchmarkApiResponse> {
        self.benchmark_api.as_ref()?.response.as_ref()
    }
}

/// Key under which the frontend index document is reconciled.
pub const INDEX_ASSET_KEY: &str = "index.html";

/// Overall verdict recorded with a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Pass,
    Degraded,
    Fail,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OverallStatus::Pass => "pass",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Fail => "fail",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Connection establishment timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectivityResult {
    pub dns_ms: f64,
    pub tcp_ms: f64,
    /// Absent for plain-HTTP targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ms: Option<f64>,
    pub total_ms: f64,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResult {
    pub status: String,
    pub response_ms: f64,
    #[serde(default)]
    pub http_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResult {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointResult {
    pub path: String,
    pub response_ms: f64,
    #[serde(default)]
    pub status: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FrontendResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_html: Option<AssetResult>,
    pub total_size_kb: f64,
    pub total_time_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssetResult {
    pub path: String,
    pub size_kb: f64,
    pub response_ms: f64,
    #[serde(default)]
    pub status: u16,
    pub success: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of one run's load test.
///
/// `total_requests == successful + failed`, and whenever
/// `total_requests > 0`: `min <= p50 <= p95 <= p99 <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadTestResult {
    pub concurrent: u32,
    pub duration_sec: f64,
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub rps: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_latency_ms: f64,
}

impl LoadTestResult {
    /// `failed / total * 100`, or `None` when no request was made.
    pub fn error_rate_pct(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.failed as f64 / self.total_requests as f64 * 100.0)
    }

    pub fn success_rate_pct(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.successful as f64 / self.total_requests as f64 * 100.0)
    }
}

/// Result of calling the target's server-side benchmark endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkApiResult {
    pub success: bool,
    #[serde(default)]
    pub http_status: u16,
    pub total_duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BenchmarkApiResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkApiResponse {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub total_duration_ms: f64,
    #[serde(default)]
    pub record_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<OperationMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<OperationMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_logic: Option<OperationMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<OperationMap>,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub successful_operations: u64,
    #[serde(default)]
    pub failed_operations: u64,
}

/// Named operations keyed by operation name; iteration is in sorted order.
pub type OperationMap = BTreeMap<String, OperationResult>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OperationResult {
    #[serde(default)]
    pub operation: String,
    pub success: bool,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_affected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
