//! Plain-text console output for run summaries and comparisons.

use rbench_core::compare::{ComparisonReport, Delta, DeltaKind, KeyedGroup, MetricRow};
use rbench_core::results::BenchmarkRun;

const PLACEHOLDER: &str = "-";

pub fn print_run(run: &BenchmarkRun) {
    println!("Target:  {}", run.target);
    println!("Overall: {}", run.overall);
    if !run.version.is_empty() {
        println!("Version: {}", run.version);
    }
    if let Some(conn) = &run.connectivity {
        if conn.connected {
            let tls = conn.tls_ms.map(|ms| format!("  tls {ms:.2}")).unwrap_or_default();
            println!(
                "Connect: dns {:.2}  tcp {:.2}{}  total {:.2} ms",
                conn.dns_ms, conn.tcp_ms, tls, conn.total_ms
            );
        } else {
            println!("Connect: FAILED ({})", conn.error.as_deref().unwrap_or(PLACEHOLDER));
        }
    }
    if let Some(health) = &run.health {
        println!(
            "Health:  {} (HTTP {}, {:.2} ms)",
            health.status, health.http_status, health.response_ms
        );
    }
    for ep in run.endpoints.iter().flatten() {
        let mark = if ep.success { "ok" } else { "FAIL" };
        println!("  {:<4} {:<30} {:>10.2} ms", mark, ep.path, ep.response_ms);
    }
    if let Some(load) = &run.load_test {
        println!(
            "Load:    {} requests ({} failed) over {:.1}s at concurrency {}",
            load.total_requests, load.failed, load.duration_sec, load.concurrent
        );
        println!(
            "         {:.2} req/s  p50 {:.2}  p95 {:.2}  p99 {:.2}  max {:.2} ms",
            load.rps, load.latency_p50_ms, load.latency_p95_ms, load.latency_p99_ms, load.max_latency_ms
        );
    }
    if let Some(api) = &run.benchmark_api {
        match &api.response {
            Some(report) if api.success => println!(
                "Server:  {} operations ({} failed) on {} records in {:.2} ms",
                report.total_operations, report.failed_operations, report.record_count, report.total_duration_ms
            ),
            _ => println!(
                "Server:  FAILED (HTTP {}, {})",
                api.http_status,
                api.error.as_deref().unwrap_or(PLACEHOLDER)
            ),
        }
    }
}

pub fn print_report(report: &ComparisonReport) {
    println!("Comparing {} runs", report.runs.len());
    for (i, run) in report.runs.iter().enumerate() {
        let version = if run.version.is_empty() { PLACEHOLDER } else { run.version.as_str() };
        println!(
            "  [{}] {}  {}  {}",
            i + 1,
            run.timestamp.format("%Y-%m-%d %H:%M:%S"),
            version,
            run.overall
        );
    }

    let mut section = None;
    for row in &report.metric_rows {
        if section != Some(row.section) {
            section = Some(row.section);
            println!();
            println!("{}", row.section.title());
        }
        print_row(&row.label, row, row.delta.as_ref());
    }

    let mut group: Option<KeyedGroup> = None;
    for row in &report.keyed_rows {
        if group != Some(row.group) {
            group = Some(row.group);
            println!();
            println!("{} ({})", row.group.title(), row.group.kind().unit());
        }
        print_values(&row.key, &row.values, row.delta.as_ref());
    }

    println!();
    if report.alerts.is_empty() {
        println!("No threshold alerts");
    } else {
        println!("Threshold alerts ({})", report.alerts.len());
        for alert in &report.alerts {
            println!("  ! {alert}");
        }
    }
}

fn print_row(label: &str, row: &MetricRow, delta: Option<&Delta>) {
    let label = match row.kind {
        Some(kind) => format!("{label} ({})", kind.unit()),
        None => label.to_string(),
    };
    print_values(&label, &row.values, delta);
}

fn print_values(label: &str, values: &[Option<f64>], delta: Option<&Delta>) {
    let cells: Vec<String> = values
        .iter()
        .map(|v| match v {
            Some(v) => format!("{v:>10.2}"),
            None => format!("{PLACEHOLDER:>10}"),
        })
        .collect();
    let delta = delta.map(format_delta).unwrap_or_default();
    println!("  {label:<28}{}  {delta}", cells.join(""));
}

fn format_delta(delta: &Delta) -> String {
    let marker = match delta.kind {
        DeltaKind::Improvement => "+",
        DeltaKind::Regression => "!",
        DeltaKind::NoChange => "=",
        DeltaKind::NoData => "?",
    };
    match delta.percent_change {
        Some(pct) => format!("{marker} {:+.2} ({pct:+.1}%) {}", delta.difference, delta.kind),
        None => format!("{marker} {:+.2} {}", delta.difference, delta.kind),
    }
}
