use crate::http::Probe;
use crate::results::EndpointResult;

/// Public endpoints benchmarked when no list is configured.
pub const DEFAULT_ENDPOINTS: &[&str] = &["/api/version", "/health"];

/// Probe each path once, in order. A failing endpoint does not stop the
/// remaining ones.
pub async fn benchmark_endpoints<P, S>(probe: &P, paths: &[S]) -> Vec<EndpointResult>
where
    P: Probe + ?Sized,
    S: AsRef<str>,
{
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let outcome = probe.issue_request(path).await;
        let success = outcome.is_success();
        let response_ms = outcome.elapsed_ms();
        tracing::debug!(path, success, response_ms, "endpoint benchmarked");

        results.push(EndpointResult {
            path: path.to_string(),
            response_ms,
            status: outcome.status.unwrap_or(0),
            success,
            error: outcome.error.or_else(|| {
                (!success).then(|| format!("HTTP {}", outcome.status.unwrap_or(0)))
            }),
        });
    }
    results
}
