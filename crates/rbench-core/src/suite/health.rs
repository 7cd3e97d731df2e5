use std::time::Instant;

use serde::Deserialize;

use crate::http::HttpClient;
use crate::results::HealthResult;

pub const HEALTH_PATH: &str = "/health";

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";
pub const STATUS_ERROR: &str = "error";

/// Body of the health endpoint. Only `status` is used.
#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: String,
}

/// Call the health endpoint once.
///
/// A transport failure or an undecodable body gives `error`, a non-200
/// answer gives `unhealthy` with the body as the error text, and otherwise
/// the status is whatever the service reports in its JSON `status` field.
pub async fn check_health(client: &HttpClient) -> HealthResult {
    let started = Instant::now();
    let outcome = client.get(HEALTH_PATH).await;
    let response_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut result = HealthResult {
        status: STATUS_ERROR.to_string(),
        response_ms,
        http_status: 0,
        error: None,
    };

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.http_status = response.status;

    if response.status != 200 {
        result.status = STATUS_UNHEALTHY.to_string();
        result.error = Some(response.text());
    } else {
        match response.json::<HealthBody>() {
            Ok(body) => result.status = body.status,
            Err(e) => result.error = Some(format!("failed to decode health response: {e}")),
        }
    }

    tracing::info!(
        status = %result.status,
        http_status = result.http_status,
        response_ms,
        "health check"
    );
    result
}
