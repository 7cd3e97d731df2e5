use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::RbenchError;
use crate::results::BenchmarkRun;

/// A serialized run record together with a label identifying where it came
/// from (usually the file name).
#[derive(Debug, Clone)]
pub struct RawRun {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawRun {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Parse every record and return the runs ordered oldest first.
///
/// Loading is all-or-nothing: the first record that fails to parse aborts
/// the load with [`RbenchError::RunParse`] naming that record. Runs with
/// equal timestamps keep their input order.
pub fn load_runs(records: &[RawRun]) -> Result<Vec<BenchmarkRun>, RbenchError> {
    let mut runs = Vec::with_capacity(records.len());
    for record in records {
        let run: BenchmarkRun =
            serde_json::from_slice(&record.bytes).map_err(|source| RbenchError::RunParse {
                record: record.name.clone(),
                source,
            })?;
        runs.push(run);
    }
    runs.sort_by_key(|r| r.timestamp);
    Ok(runs)
}

/// Read the files at `paths` and load them with [`load_runs`].
pub async fn read_runs(paths: &[PathBuf]) -> Result<Vec<BenchmarkRun>, RbenchError> {
    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await?;
        records.push(RawRun::new(path.display().to_string(), bytes));
    }
    load_runs(&records)
}

/// List run record files in `dir`, sorted by file name.
///
/// Timestamped `benchmark_*.json` files are preferred; when there are none,
/// any `*.json` file is accepted.
pub async fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, RbenchError> {
    let dir = dir.as_ref();
    let mut all_json = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            all_json.push(path);
        }
    }
    all_json.sort();

    let timestamped: Vec<PathBuf> = all_json
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("benchmark_"))
        })
        .cloned()
        .collect();

    let files = if timestamped.is_empty() { all_json } else { timestamped };
    if files.is_empty() {
        return Err(RbenchError::NoRunsFound(dir.display().to_string()));
    }
    Ok(files)
}

/// Write a [`BenchmarkRun`] to disk as pretty-printed JSON.
pub async fn write_run(run: &BenchmarkRun, path: impl AsRef<Path>) -> Result<(), RbenchError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let content = serde_json::to_string_pretty(run)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// `benchmark_YYYY-MM-DD_HHMMSS.json` for a run taken at `timestamp`.
pub fn default_run_file_name(timestamp: DateTime<Utc>) -> String {
    format!("benchmark_{}.json", timestamp.format("%Y-%m-%d_%H%M%S"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run_json(ts: &str, version: &str) -> String {
        format!(r#"{{"timestamp":"{ts}","target":"https://a.example","version":"{version}","overall":"pass"}}"#)
    }

    // -----------------------------------------------------------------------
    // load_runs
    // -----------------------------------------------------------------------

    #[test]
    fn load_runs_orders_by_timestamp() {
        let records = vec![
            RawRun::new("c.json", run_json("2026-01-03T10:00:00Z", "3")),
            RawRun::new("a.json", run_json("2026-01-01T10:00:00Z", "1")),
            RawRun::new("b.json", run_json("2026-01-02T10:00:00Z", "2")),
        ];
        let runs = load_runs(&records).expect("should load");
        let versions: Vec<&str> = runs.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, ["1", "2", "3"]);
    }

    #[test]
    fn load_runs_keeps_input_order_for_equal_timestamps() {
        let records = vec![
            RawRun::new("x.json", run_json("2026-01-01T10:00:00Z", "first")),
            RawRun::new("y.json", run_json("2026-01-01T10:00:00Z", "second")),
        ];
        let runs = load_runs(&records).unwrap();
        assert_eq!(runs[0].version, "first");
        assert_eq!(runs[1].version, "second");
    }

    #[test]
    fn load_runs_aborts_on_first_bad_record() {
        let records = vec![
            RawRun::new("good.json", run_json("2026-01-01T10:00:00Z", "1")),
            RawRun::new("broken.json", "{ not json"),
            RawRun::new("also-good.json", run_json("2026-01-02T10:00:00Z", "2")),
        ];
        let err = load_runs(&records).unwrap_err();
        match err {
            RbenchError::RunParse { record, .. } => assert_eq!(record, "broken.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_runs_rejects_record_missing_timestamp() {
        let records = vec![RawRun::new("no-ts.json", r#"{"target":"t"}"#)];
        assert!(matches!(
            load_runs(&records),
            Err(RbenchError::RunParse { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // scan_directory / read_runs / write_run
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn scan_directory_prefers_benchmark_files() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        for name in [
            "benchmark_2026-01-02_100000.json",
            "benchmark_2026-01-01_100000.json",
            "notes.json",
            "readme.md",
        ] {
            tokio::fs::write(dir.path().join(name), b"{}").await.unwrap();
        }
        let files = scan_directory(dir.path()).await.expect("scan should succeed");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["benchmark_2026-01-01_100000.json", "benchmark_2026-01-02_100000.json"]
        );
    }

    #[tokio::test]
    async fn scan_directory_falls_back_to_any_json() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["results2.json", "results1.json"] {
            tokio::fs::write(dir.path().join(name), b"{}").await.unwrap();
        }
        let files = scan_directory(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("results1.json"));
    }

    #[tokio::test]
    async fn scan_directory_errors_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_directory(dir.path()).await.unwrap_err();
        assert!(matches!(err, RbenchError::NoRunsFound(_)));
    }

    #[tokio::test]
    async fn read_runs_names_the_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("benchmark_a.json");
        let bad = dir.path().join("benchmark_b.json");
        tokio::fs::write(&good, run_json("2026-01-01T10:00:00Z", "1")).await.unwrap();
        tokio::fs::write(&bad, b"[1, 2").await.unwrap();

        let err = read_runs(&[good, bad]).await.unwrap_err();
        assert!(err.to_string().contains("benchmark_b.json"));
    }

    #[tokio::test]
    async fn read_runs_error_for_missing_file() {
        let result = read_runs(&[PathBuf::from("/nonexistent/benchmark_x.json")]).await;
        assert!(matches!(result, Err(RbenchError::Io(_))));
    }

    #[tokio::test]
    async fn write_then_read_preserves_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = BenchmarkRun::new("https://a.example");
        run.version = "1.2.3".to_string();
        let path = dir.path().join("nested").join(default_run_file_name(run.timestamp));

        write_run(&run, &path).await.expect("write should succeed");
        let loaded = read_runs(&[path.clone()]).await.expect("read should succeed");
        assert_eq!(loaded, vec![run]);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains('\n'));
    }

    #[test]
    fn default_file_name_uses_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 8, 12, 5, 9).unwrap();
        assert_eq!(default_run_file_name(ts), "benchmark_2026-01-08_120509.json");
    }
}
