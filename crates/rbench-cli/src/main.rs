use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use rbench_core::compare::{compare_runs, DeltaTolerances, ThresholdConfig};
use rbench_core::engine::{LoadTestConfig, DEFAULT_PROBE_PATH};
use rbench_core::http::HttpClient;
use rbench_core::results::{default_run_file_name, read_runs, scan_directory, write_run};
use rbench_core::suite::{
    run_benchmark, BenchmarkApiOptions, BenchmarkOptions, DEFAULT_BENCHMARK_RECORDS, DEFAULT_ENDPOINTS,
};

mod render;

#[derive(Parser, Debug)]
#[command(name = "rbench")]
#[command(about = "HTTP benchmark runner and run-to-run regression checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Benchmark a target and write the run record
    Run(RunArgs),
    /// Compare stored run records and check thresholds
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Base URL of the target service
    #[arg(long, env = "RBENCH_URL")]
    url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "RBENCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Version label stored with the run
    #[arg(long, default_value = "")]
    version_label: String,

    /// Concurrent load-test workers
    #[arg(long, default_value = "5")]
    concurrent: u32,

    /// Load-test window, e.g. 10s, 500ms, 1m30s
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// Per-request timeout
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Path hammered by the load test
    #[arg(long, default_value = DEFAULT_PROBE_PATH)]
    probe_path: String,

    /// Endpoint to time once (repeatable; defaults to the public endpoints)
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Skip the DNS, TCP and TLS timings
    #[arg(long)]
    no_connectivity: bool,

    /// Skip the load test
    #[arg(long)]
    no_load_test: bool,

    /// Run the server-side benchmark (requires --token)
    #[arg(long)]
    benchmark_api: bool,

    /// Records the server-side benchmark should work through
    #[arg(long, default_value_t = DEFAULT_BENCHMARK_RECORDS)]
    benchmark_records: u32,

    /// Write the run record to this file
    #[arg(long, conflicts_with = "output_dir")]
    json: Option<PathBuf>,

    /// Write the run record into this directory under a timestamped name
    #[arg(long, env = "RBENCH_OUTPUT_DIR", default_value = "benchmark-results")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Directory containing run records
    dir: PathBuf,

    /// JSON file with threshold limits; flags below override it
    #[arg(long)]
    thresholds_file: Option<PathBuf>,

    /// Maximum P95 latency (ms)
    #[arg(long)]
    threshold_p95: Option<f64>,

    /// Maximum P99 latency (ms)
    #[arg(long)]
    threshold_p99: Option<f64>,

    /// Maximum load-test error rate (%)
    #[arg(long)]
    threshold_error_rate: Option<f64>,

    /// Minimum load-test RPS
    #[arg(long)]
    threshold_rps_min: Option<f64>,

    /// Maximum health-check response time (ms)
    #[arg(long)]
    threshold_health: Option<f64>,

    /// Write the full comparison as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Exit with status 1 when any threshold alert was raised
    #[arg(long)]
    fail_on_alert: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Compare(args) => compare(args).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Cancelled on the first Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping");
            trigger.cancel();
        }
    });
    token
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let mut builder = HttpClient::builder(&args.url)
        .timeout(args.timeout)
        .danger_accept_invalid_certs(args.insecure);
    if let Some(token) = &args.token {
        builder = builder.bearer_token(token);
    }
    let client = Arc::new(builder.build().context("failed to build HTTP client")?);

    let endpoints = if args.endpoints.is_empty() {
        DEFAULT_ENDPOINTS.iter().map(|p| p.to_string()).collect()
    } else {
        args.endpoints
    };
    let load_test = (!args.no_load_test).then(|| {
        LoadTestConfig::new(args.concurrent, args.duration).with_probe_path(&args.probe_path)
    });
    let benchmark_api = args.benchmark_api.then_some(BenchmarkApiOptions {
        include_concurrent: args.concurrent > 1,
        records: args.benchmark_records,
    });
    let options = BenchmarkOptions {
        version: args.version_label,
        measure_connectivity: !args.no_connectivity,
        endpoints,
        benchmark_api,
        load_test,
    };

    let run = run_benchmark(client, &options, ctrl_c_token())
        .await
        .context("benchmark failed")?;

    let path = match args.json {
        Some(path) => path,
        None => args.output_dir.join(default_run_file_name(run.timestamp)),
    };
    write_run(&run, &path)
        .await
        .with_context(|| format!("failed to write run record to {}", path.display()))?;

    render::print_run(&run);
    println!("Run record written to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn compare(args: CompareArgs) -> Result<ExitCode> {
    let mut thresholds = match &args.thresholds_file {
        Some(path) => ThresholdConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load thresholds from {}", path.display()))?,
        None => ThresholdConfig::default(),
    };
    if let Some(v) = args.threshold_p95 {
        thresholds.latency_p95_max_ms = v;
    }
    if let Some(v) = args.threshold_p99 {
        thresholds.latency_p99_max_ms = v;
    }
    if let Some(v) = args.threshold_error_rate {
        thresholds.error_rate_max_pct = v;
    }
    if let Some(v) = args.threshold_rps_min {
        thresholds.rps_min = v;
    }
    if let Some(v) = args.threshold_health {
        thresholds.health_response_max_ms = v;
    }
    thresholds.validate()?;

    let files = scan_directory(&args.dir).await?;
    tracing::info!(files = files.len(), dir = %args.dir.display(), "loading run records");
    let runs = read_runs(&files).await?;
    let report = compare_runs(&runs, &thresholds, &DeltaTolerances::default())?;

    render::print_report(&report);

    if let Some(path) = &args.json {
        let content = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write comparison to {}", path.display()))?;
        println!("Comparison written to {}", path.display());
    }

    if args.fail_on_alert && report.has_alerts() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
