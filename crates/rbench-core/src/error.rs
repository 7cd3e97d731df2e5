#[derive(Debug, thiserror::Error)]
pub enum RbenchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Engine error: {0}")]
    Engine(String),

    /// A historical run record could not be decoded. `record` names the
    /// offending file (or blob label) so the caller can fix it.
    #[error("Failed to parse run record {record}: {source}")]
    RunParse {
        record: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Comparison requires at least 2 runs, got {found}")]
    InsufficientRuns { found: usize },

    #[error("No .json run records found in {0}")]
    NoRunsFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = RbenchError::Validation("concurrency must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: concurrency must be at least 1"
        );
    }

    #[test]
    fn engine_error_display() {
        let err = RbenchError::Engine("worker panicked".to_string());
        assert_eq!(err.to_string(), "Engine error: worker panicked");
    }

    #[test]
    fn insufficient_runs_display() {
        let err = RbenchError::InsufficientRuns { found: 1 };
        assert_eq!(err.to_string(), "Comparison requires at least 2 runs, got 1");
    }

    #[test]
    fn no_runs_found_display() {
        let err = RbenchError::NoRunsFound("./reports".to_string());
        assert_eq!(err.to_string(), "No .json run records found in ./reports");
    }

    #[test]
    fn run_parse_names_the_record() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = RbenchError::RunParse {
            record: "benchmark_2026-01-02_100000.json".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse run record benchmark_2026-01-02_100000.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RbenchError = io_err.into();
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn serde_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let err: RbenchError = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
