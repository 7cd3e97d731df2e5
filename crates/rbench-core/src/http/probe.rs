use std::time::Duration;

use async_trait::async_trait;

/// Capability to issue a single idempotent, read-only request against the
/// target and report how it went.
///
/// Implementations must never fail the caller: transport errors are folded
/// into [`ProbeOutcome::error`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn issue_request(&self, path: &str) -> ProbeOutcome;
}

/// The outcome of one probe request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// HTTP status code, or `None` when no response was received.
    pub status: Option<u16>,
    /// Round-trip time as measured by the probe implementation.
    pub elapsed: Duration,
    /// Transport-level error message, if the request did not complete.
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn completed(status: u16, elapsed: Duration) -> Self {
        Self {
            status: Some(status),
            elapsed,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: None,
            elapsed,
            error: Some(error.into()),
        }
    }

    /// A request succeeds only when it completed with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(200..=299))
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_2xx_is_success() {
        assert!(ProbeOutcome::completed(200, Duration::from_millis(3)).is_success());
        assert!(ProbeOutcome::completed(204, Duration::ZERO).is_success());
        assert!(ProbeOutcome::completed(299, Duration::ZERO).is_success());
    }

    #[test]
    fn non_2xx_is_failure() {
        assert!(!ProbeOutcome::completed(199, Duration::ZERO).is_success());
        assert!(!ProbeOutcome::completed(301, Duration::ZERO).is_success());
        assert!(!ProbeOutcome::completed(404, Duration::ZERO).is_success());
        assert!(!ProbeOutcome::completed(503, Duration::ZERO).is_success());
    }

    #[test]
    fn transport_error_is_failure() {
        let outcome = ProbeOutcome::failed("connection refused", Duration::from_millis(1));
        assert!(!outcome.is_success());
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.error.as_deref(), Some("connection refused"));
    }
}
