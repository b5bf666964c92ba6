//! Human-readable run report

use std::fmt::Write;

use osbench_core::{AggregateReport, LatencyStats, RunConfig};

const RULE_WIDTH: usize = 70;

/// Print the report to stdout
pub fn print_report(report: &AggregateReport, config: &RunConfig) {
    println!("{}", render_report(report, config));
}

/// Render the report as text
pub fn render_report(report: &AggregateReport, config: &RunConfig) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    // writing into a String cannot fail
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "   Results: {} on {}", config.task, config.collection);
    let _ = writeln!(out, "{rule}");

    if report.cancelled {
        let _ = writeln!(out, "⚠ Run interrupted, totals cover the work done before the stop");
    }
    if report.is_partial() {
        let _ = writeln!(
            out,
            "⚠ {} of {} workers reported, totals are partial",
            report.worker_count, report.expected_workers
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "📊 Overall:");
    let _ = writeln!(out, "  Produced:             {}", report.total_produced);
    let _ = writeln!(
        out,
        "  Succeeded:            {} ({:.1}%)",
        report.total_success,
        report.success_rate * 100.0
    );
    let _ = writeln!(out, "  Failed:               {}", report.total_fail);
    let _ = writeln!(out, "  Requests:             {}", report.total_requests);
    let _ = writeln!(out, "  Retries:              {}", report.total_retries);
    let _ = writeln!(out, "  Errors:               {}", report.total_errors);

    let _ = writeln!(out);
    let _ = writeln!(out, "🚀 Performance:");
    let _ = writeln!(out, "  Throughput:           {:.2} items/s", report.throughput);
    let _ = writeln!(out, "  Duration:             {:.2} s", report.duration_secs);
    let _ = writeln!(out, "  Workers:              {}", report.worker_count);

    let _ = writeln!(out);
    let _ = writeln!(out, "⏱️  Client latency:");
    write_latency(&mut out, &report.latency);

    if let Some(took) = &report.took {
        let _ = writeln!(out);
        let _ = writeln!(out, "🖥️  Server took:");
        write_latency(&mut out, took);
    }

    if !report.per_worker.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "👷 Per worker:");
        let _ = writeln!(
            out,
            "  {:>6} {:>10} {:>8} {:>9} {:>12} {:>10}",
            "id", "success", "fail", "requests", "items/s", "p50 ms"
        );
        for worker in &report.per_worker {
            let _ = writeln!(
                out,
                "  {:>6} {:>10} {:>8} {:>9} {:>12.2} {:>10.2}{}",
                worker.worker_id,
                worker.success_count,
                worker.fail_count,
                worker.request_count,
                worker.throughput,
                worker.latency.p50,
                if worker.panicked { "  (panicked)" } else { "" }
            );
        }

        let errors: Vec<&String> = report
            .per_worker
            .iter()
            .flat_map(|worker| worker.errors.iter())
            .take(5)
            .collect();
        if !errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "❌ First errors:");
            for error in errors {
                let _ = writeln!(out, "  - {error}");
            }
        }
    }

    let _ = writeln!(out, "{rule}");
    out
}

fn write_latency(out: &mut String, stats: &LatencyStats) {
    let _ = writeln!(out, "  Average:              {:.2} ms", stats.avg);
    let _ = writeln!(out, "  Min / Max:            {:.2} / {:.2} ms", stats.min, stats.max);
    let _ = writeln!(out, "  Median (P50):         {:.2} ms", stats.p50);
    let _ = writeln!(out, "  95th Percentile:      {:.2} ms", stats.p95);
    let _ = writeln!(out, "  99th Percentile:      {:.2} ms", stats.p99);
}
