//! The benchmark suite: connectivity, health, version, endpoint timings,
//! the server-side benchmark and the load test against one target,
//! collected into a [`BenchmarkRun`].

pub mod connectivity;
pub mod endpoints;
pub mod health;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::{run_load_test_with_cancel, LoadTestConfig};
use crate::error::RbenchError;
use crate::http::HttpClient;
use crate::results::{BenchmarkRun, HealthResult, LoadTestResult, OverallStatus};

pub use connectivity::measure_connectivity;
pub use endpoints::{benchmark_endpoints, DEFAULT_ENDPOINTS};
pub use health::check_health;
pub use server::{discover_version, run_benchmark_api, BenchmarkApiOptions, DEFAULT_BENCHMARK_RECORDS};

/// Error-rate percentage above which a run is reported as degraded.
pub const DEGRADED_ERROR_RATE_PCT: f64 = 1.0;

/// What the suite should measure.
#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    /// Version label to record. When empty, the version reported by the
    /// server-side benchmark or by the version endpoint is used.
    pub version: String,
    pub measure_connectivity: bool,
    pub endpoints: Vec<String>,
    /// Only called when the client carries a bearer token.
    pub benchmark_api: Option<BenchmarkApiOptions>,
    /// `None` skips the load test entirely; the run then carries no
    /// `load_test` section.
    pub load_test: Option<LoadTestConfig>,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            version: String::new(),
            measure_connectivity: true,
            endpoints: DEFAULT_ENDPOINTS.iter().map(|p| p.to_string()).collect(),
            benchmark_api: None,
            load_test: Some(LoadTestConfig::new(5, Duration::from_secs(10))),
        }
    }
}

/// Run the full suite against `client` and return the assembled run record.
///
/// Only a configuration error in the load test aborts the suite; request
/// failures are recorded inside the run.
pub async fn run_benchmark(
    client: Arc<HttpClient>,
    options: &BenchmarkOptions,
    cancel: CancellationToken,
) -> Result<BenchmarkRun, RbenchError> {
    if let Some(config) = &options.load_test {
        config.validate()?;
    }

    let mut run = BenchmarkRun::new(client.base_url());
    tracing::info!(target = %run.target, "benchmark started");

    if options.measure_connectivity {
        run.connectivity = Some(
            measure_connectivity(client.base_url(), client.timeout(), client.accepts_invalid_certs())
                .await,
        );
    }

    run.health = Some(check_health(&client).await);
    let mut version = discover_version(&client).await.unwrap_or_default();

    if !options.endpoints.is_empty() {
        run.endpoints = Some(benchmark_endpoints(client.as_ref(), &options.endpoints).await);
    }

    if let Some(api_options) = &options.benchmark_api {
        if client.is_authenticated() {
            let result = run_benchmark_api(&client, api_options).await;
            if let Some(reported) = result.response.as_ref().map(|r| &r.version) {
                if !reported.is_empty() {
                    version = reported.clone();
                }
            }
            run.benchmark_api = Some(result);
        } else {
            tracing::warn!("server-side benchmark skipped, no bearer token configured");
        }
    }

    run.version = if options.version.is_empty() {
        version
    } else {
        options.version.clone()
    };

    if let Some(config) = &options.load_test {
        if cancel.is_cancelled() {
            tracing::warn!("load test skipped, benchmark cancelled");
        } else {
            run.load_test = Some(run_load_test_with_cancel(Arc::clone(&client), config, cancel).await?);
        }
    }

    run.overall = overall_status(&run);
    tracing::info!(overall = %run.overall, version = %run.version, "benchmark finished");
    Ok(run)
}

/// `fail` when the target was unreachable or its health check did not
/// report healthy, `degraded` when an endpoint failed or the load-test
/// error rate exceeded [`DEGRADED_ERROR_RATE_PCT`], otherwise `pass`.
pub fn overall_status(run: &BenchmarkRun) -> OverallStatus {
    if run.connectivity.as_ref().is_some_and(|c| !c.connected) {
        return OverallStatus::Fail;
    }
    if !run.health.as_ref().is_some_and(HealthResult::is_healthy) {
        return OverallStatus::Fail;
    }
    let endpoint_failed = run
        .endpoints
        .iter()
        .flatten()
        .any(|e| !e.success);
    let error_rate_high = run
        .load_test
        .as_ref()
        .and_then(LoadTestResult::error_rate_pct)
        .is_some_and(|rate| rate > DEGRADED_ERROR_RATE_PCT);
    if endpoint_failed || error_rate_high {
        OverallStatus::Degraded
    } else {
        OverallStatus::Pass
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ConnectivityResult, EndpointResult};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn health(status: &str) -> HealthResult {
        HealthResult {
            status: status.to_string(),
            response_ms: 10.0,
            http_status: 200,
            error: None,
        }
    }

    fn endpoint(success: bool) -> EndpointResult {
        EndpointResult {
            path: "/api/version".to_string(),
            response_ms: 10.0,
            status: if success { 200 } else { 500 },
            success,
            error: None,
        }
    }

    fn load(total: u64, failed: u64) -> LoadTestResult {
        LoadTestResult {
            concurrent: 1,
            duration_sec: 1.0,
            total_requests: total,
            successful: total - failed,
            failed,
            rps: total as f64,
            latency_p50_ms: 1.0,
            latency_p95_ms: 1.0,
            latency_p99_ms: 1.0,
            min_latency_ms: 1.0,
            max_latency_ms: 1.0,
            avg_latency_ms: 1.0,
        }
    }

    fn healthy_run() -> BenchmarkRun {
        let mut run = BenchmarkRun::new("t");
        run.health = Some(health("healthy"));
        run
    }

    /// Target answering health, version and benchmark calls.
    async fn target(health_status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(health_status).set_body_string(r#"{"status":"healthy"}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version":"0.20.0"}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/benchmark"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"version":"0.21.0","total_duration_ms":90,"record_count":1000,
                    "database":{"insert":{"operation":"insert","success":true,"duration_ms":4}}}"#,
            ))
            .mount(&server)
            .await;
        server
    }

    fn quiet_options() -> BenchmarkOptions {
        BenchmarkOptions {
            load_test: None,
            ..BenchmarkOptions::default()
        }
    }

    // -----------------------------------------------------------------------
    // overall_status
    // -----------------------------------------------------------------------

    #[test]
    fn missing_or_unhealthy_health_fails() {
        assert_eq!(overall_status(&BenchmarkRun::new("t")), OverallStatus::Fail);
        for status in ["unhealthy", "error", "degraded"] {
            let mut run = BenchmarkRun::new("t");
            run.health = Some(health(status));
            assert_eq!(overall_status(&run), OverallStatus::Fail);
        }
    }

    #[test]
    fn unreachable_target_fails() {
        let mut run = healthy_run();
        run.connectivity = Some(ConnectivityResult {
            dns_ms: 1.0,
            tcp_ms: 2.0,
            tls_ms: None,
            total_ms: 0.0,
            connected: false,
            error: Some("TCP connection failed".to_string()),
        });
        assert_eq!(overall_status(&run), OverallStatus::Fail);
    }

    #[test]
    fn failed_endpoint_degrades() {
        let mut run = healthy_run();
        run.endpoints = Some(vec![endpoint(true), endpoint(false)]);
        assert_eq!(overall_status(&run), OverallStatus::Degraded);
    }

    #[test]
    fn error_rate_above_one_percent_degrades() {
        let mut run = healthy_run();
        run.load_test = Some(load(100, 1));
        assert_eq!(overall_status(&run), OverallStatus::Pass);
        run.load_test = Some(load(100, 2));
        assert_eq!(overall_status(&run), OverallStatus::Degraded);
        run.load_test = Some(load(0, 0));
        assert_eq!(overall_status(&run), OverallStatus::Pass);
    }

    // -----------------------------------------------------------------------
    // run_benchmark
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn healthy_target_passes() {
        let server = target(200).await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            endpoints: vec!["/api/version".to_string(), "/health".to_string()],
            load_test: Some(LoadTestConfig::new(2, Duration::from_millis(100))),
            ..BenchmarkOptions::default()
        };

        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .expect("suite should run");

        assert_eq!(run.target, server.uri());
        assert_eq!(run.version, "0.20.0");
        let connectivity = run.connectivity.as_ref().unwrap();
        assert!(connectivity.connected);
        assert_eq!(connectivity.tls_ms, None);
        assert!(run.health.as_ref().unwrap().is_healthy());
        assert_eq!(run.endpoints.as_ref().unwrap().len(), 2);
        assert!(run.benchmark_api.is_none());
        let load = run.load_test.as_ref().unwrap();
        assert!(load.total_requests > 0);
        assert_eq!(load.failed, 0);
        assert_eq!(run.overall, OverallStatus::Pass);
    }

    #[tokio::test]
    async fn server_benchmark_version_wins_over_version_endpoint() {
        let server = target(200).await;
        let client = Arc::new(
            HttpClient::builder(server.uri())
                .bearer_token("t0k3n")
                .build()
                .unwrap(),
        );
        let options = BenchmarkOptions {
            benchmark_api: Some(BenchmarkApiOptions::default()),
            ..quiet_options()
        };

        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();

        let api = run.benchmark_api.as_ref().unwrap();
        assert!(api.success);
        assert_eq!(run.version, "0.21.0");
        let db = run.benchmark_response().unwrap().database.as_ref().unwrap();
        assert_eq!(db["insert"].duration_ms, 4.0);
    }

    #[tokio::test]
    async fn explicit_label_wins_over_discovered_version() {
        let server = target(200).await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            version: "release-candidate".to_string(),
            ..quiet_options()
        };
        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.version, "release-candidate");
    }

    #[tokio::test]
    async fn server_benchmark_needs_a_token() {
        let server = target(200).await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            benchmark_api: Some(BenchmarkApiOptions::default()),
            ..quiet_options()
        };
        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();
        assert!(run.benchmark_api.is_none());
        assert_eq!(run.version, "0.20.0");
    }

    #[tokio::test]
    async fn failing_endpoint_is_degraded() {
        let server = target(200).await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            endpoints: vec!["/api/missing".to_string()],
            ..quiet_options()
        };

        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();

        assert!(run.load_test.is_none());
        assert_eq!(run.endpoints.as_ref().unwrap()[0].status, 404);
        assert_eq!(run.overall, OverallStatus::Degraded);
    }

    #[tokio::test]
    async fn unhealthy_target_fails() {
        let server = target(503).await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            endpoints: Vec::new(),
            ..quiet_options()
        };
        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();
        assert!(run.endpoints.is_none());
        assert_eq!(run.health.as_ref().unwrap().status, "unhealthy");
        assert_eq!(run.overall, OverallStatus::Fail);
    }

    #[tokio::test]
    async fn unreachable_target_records_failed_connectivity() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = Arc::new(
            HttpClient::builder(format!("http://127.0.0.1:{port}"))
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
        );
        let options = BenchmarkOptions {
            endpoints: Vec::new(),
            ..quiet_options()
        };

        let run = run_benchmark(client, &options, CancellationToken::new())
            .await
            .unwrap();

        assert!(!run.connectivity.as_ref().unwrap().connected);
        assert_eq!(run.health.as_ref().unwrap().status, "error");
        assert_eq!(run.version, "");
        assert_eq!(run.overall, OverallStatus::Fail);
    }

    #[tokio::test]
    async fn invalid_load_config_aborts_before_any_request() {
        let server = MockServer::start().await;
        let client = Arc::new(HttpClient::builder(server.uri()).build().unwrap());
        let options = BenchmarkOptions {
            load_test: Some(LoadTestConfig::new(0, Duration::from_secs(1))),
            ..BenchmarkOptions::default()
        };
        let result = run_benchmark(client, &options, CancellationToken::new()).await;
        assert!(matches!(result, Err(RbenchError::Validation(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
