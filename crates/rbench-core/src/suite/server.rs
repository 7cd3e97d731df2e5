//! Calls that read information from the target service itself: its
//! reported version and its server-side benchmark endpoint.

use std::time::Instant;

use serde::Deserialize;

use crate::http::HttpClient;
use crate::results::{BenchmarkApiResponse, BenchmarkApiResult};

pub const VERSION_PATH: &str = "/api/version";
pub const BENCHMARK_API_PATH: &str = "/api/benchmark";

/// Record count the server uses when none is requested.
pub const DEFAULT_BENCHMARK_RECORDS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct VersionBody {
    #[serde(default)]
    version: String,
}

/// The version the target reports, or `None` when it cannot be read.
pub async fn discover_version(client: &HttpClient) -> Option<String> {
    let response = match client.get(VERSION_PATH).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, "version lookup failed");
            return None;
        }
    };
    let body: VersionBody = response.json().ok()?;
    (!body.version.is_empty()).then_some(body.version)
}

/// How to call the server-side benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkApiOptions {
    pub include_concurrent: bool,
    pub records: u32,
}

impl Default for BenchmarkApiOptions {
    fn default() -> Self {
        Self {
            include_concurrent: false,
            records: DEFAULT_BENCHMARK_RECORDS,
        }
    }
}

impl BenchmarkApiOptions {
    /// Request path with query. The record count is only sent when it
    /// differs from the server default.
    pub fn path(&self) -> String {
        let mut params = Vec::new();
        if self.include_concurrent {
            params.push("concurrent=true".to_string());
        }
        if self.records > 0 && self.records != DEFAULT_BENCHMARK_RECORDS {
            params.push(format!("records={}", self.records));
        }
        if params.is_empty() {
            BENCHMARK_API_PATH.to_string()
        } else {
            format!("{BENCHMARK_API_PATH}?{}", params.join("&"))
        }
    }
}

/// POST to the benchmark endpoint and decode its report.
pub async fn run_benchmark_api(client: &HttpClient, options: &BenchmarkApiOptions) -> BenchmarkApiResult {
    let path = options.path();
    tracing::info!(%path, "running server-side benchmark");

    let started = Instant::now();
    let outcome = client.post(&path).await;
    let total_duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut result = BenchmarkApiResult {
        success: false,
        http_status: 0,
        total_duration_ms,
        response: None,
        error: None,
    };

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.http_status = response.status;

    if response.status != 200 {
        result.error = Some(response.text());
        return result;
    }
    match response.json::<BenchmarkApiResponse>() {
        Ok(report) => {
            result.success = true;
            result.response = Some(report);
        }
        Err(e) => result.error = Some(format!("failed to decode benchmark response: {e}")),
    }
    result
}
