use crate::analyze::{mean, scaling_efficiency, standard_stats};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::locate::LogReader;
use crate::model::{ScalingEfficiency, StandardStats, SummaryOutput};
use crate::parse::{parse_http_scaling, HttpScalingLine};
use crate::report::chart::{self, runtime_color, BarSeries, Line, Measure, Reference};
use crate::report::{console, save_chart};
use crate::scenario::{read_runtime_logs, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BENCHMARK: &str = "http-hello-scaling";
const KB_PER_MB: f64 = 1024.0;

const RUNTIMES: [RuntimeSource; 3] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasmtime"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConcurrencyLevel {
    concurrency: u32,
    throughput_rps: StandardStats,
    avg_memory_mb: f64,
    total_memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuntimeScaling {
    runtime: String,
    levels: Vec<ConcurrencyLevel>,
    efficiency: Vec<ScalingEfficiency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpHelloScalingSummary {
    runtimes: Vec<RuntimeScaling>,
}

pub(crate) fn summarize_http_hello_scaling(
    config: &AnalysisConfig,
) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut data: Vec<(&str, BTreeMap<u32, Vec<HttpScalingLine>>)> = Vec::new();

    for source in &RUNTIMES {
        let lines = read_runtime_logs(config, &mut reader, BENCHMARK, source, parse_http_scaling)?;
        if lines.is_empty() {
            continue;
        }

        let by_concurrency = lines
            .into_iter()
            .into_group_map_by(|line| line.concurrency)
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        data.push((source.name, by_concurrency));
    }

    if data.is_empty() {
        println!("ERROR: No http-hello scaling data found.");
        println!("\nRun the scaling benchmark first:");
        for source in &RUNTIMES {
            println!(
                "  RUNTIME={} ./scripts/measure_http_hello_scaling.sh",
                source.dir
            );
        }
        return Err(AnalysisError::NoScalingData {
            benchmark: "http-hello",
        }
        .into());
    }

    let mut runtimes = Vec::new();
    for (runtime, by_concurrency) in &data {
        let mut levels = Vec::new();
        for (concurrency, lines) in by_concurrency {
            let throughput = lines.iter().map(|l| l.throughput_rps).collect::<Vec<_>>();
            let avg_rss = lines.iter().map(|l| l.avg_rss_kb as f64).collect::<Vec<_>>();
            let total_rss = lines
                .iter()
                .map(|l| l.total_rss_kb as f64)
                .collect::<Vec<_>>();

            levels.push(ConcurrencyLevel {
                concurrency: *concurrency,
                throughput_rps: standard_stats(&throughput)
                    .with_context(|| format!("Throughput stats for {runtime} conc={concurrency}"))?,
                avg_memory_mb: mean(&avg_rss)? / KB_PER_MB,
                total_memory_mb: mean(&total_rss)? / KB_PER_MB,
            });
        }

        let means = levels
            .iter()
            .map(|l| (l.concurrency, l.throughput_rps.mean))
            .collect::<BTreeMap<_, _>>();

        runtimes.push(RuntimeScaling {
            runtime: runtime.to_string(),
            efficiency: scaling_efficiency(&means),
            levels,
        });
    }

    print_summary(&runtimes);

    config.ensure_out_dir()?;

    let throughput_lines = lines_for(&runtimes, |l| {
        Measure::with_error(l.throughput_rps.mean, l.throughput_rps.std)
    });
    save_chart(&config.output_path("http_hello_scaling_throughput.png"), |path| {
        chart::line_chart(
            path,
            "HTTP Scaling: Throughput vs Concurrency",
            "Concurrent Instances",
            "Aggregate Throughput (req/s)",
            &throughput_lines,
            None,
        )
    });

    let concurrencies = runtimes
        .iter()
        .flat_map(|rt| rt.efficiency.iter().map(|e| e.concurrency))
        .sorted()
        .dedup()
        .collect::<Vec<_>>();
    let efficiency_series = runtimes
        .iter()
        .map(|rt| BarSeries {
            name: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            measures: concurrencies
                .iter()
                .map(|c| {
                    rt.efficiency
                        .iter()
                        .find(|e| e.concurrency == *c)
                        .map(|e| Measure::new(e.efficiency_pct))
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    let categories = concurrencies
        .iter()
        .map(|c| format!("{c}x"))
        .collect::<Vec<_>>();
    save_chart(&config.output_path("http_hello_scaling_efficiency.png"), |path| {
        chart::grouped_bar_chart(
            path,
            "HTTP Scaling Efficiency Comparison",
            "Scaling Efficiency (%)",
            &categories,
            &efficiency_series,
            Some(&Reference {
                label: "Ideal (100%)".to_string(),
                value: 100.0,
            }),
        )
    });

    let memory_lines = lines_for(&runtimes, |l| Measure::new(l.avg_memory_mb));
    save_chart(
        &config.output_path("http_hello_scaling_memory_per_instance.png"),
        |path| {
            chart::line_chart(
                path,
                "HTTP Scaling: Memory Usage per Instance",
                "Concurrent Instances",
                "Average Memory per Instance (MB)",
                &memory_lines,
                None,
            )
        },
    );

    let total_memory_lines = lines_for(&runtimes, |l| Measure::new(l.total_memory_mb));
    save_chart(&config.output_path("http_hello_scaling_total_memory.png"), |path| {
        chart::line_chart(
            path,
            "HTTP Scaling: Total System Memory Usage",
            "Concurrent Instances",
            "Total Memory Consumption (MB)",
            &total_memory_lines,
            None,
        )
    });

    let output = SummaryOutput::new(
        Scenario::HttpHelloScaling.name(),
        reader.finish(),
        HttpHelloScalingSummary { runtimes },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}

fn lines_for<F>(runtimes: &[RuntimeScaling], measure: F) -> Vec<Line>
where
    F: Fn(&ConcurrencyLevel) -> Measure,
{
    runtimes
        .iter()
        .map(|rt| Line {
            name: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            points: rt
                .levels
                .iter()
                .map(|l| (f64::from(l.concurrency), measure(l)))
                .collect(),
        })
        .collect()
}

fn print_summary(runtimes: &[RuntimeScaling]) {
    console::print_banner("HTTP HELLO-WORLD SCALING SUMMARY");

    for rt in runtimes {
        println!("\n{}:", rt.runtime.to_uppercase());
        println!("{}", "-".repeat(80));
        for level in &rt.levels {
            println!(
                "  Concurrency {:2}: throughput={:8.1} ± {:6.1} req/s  avg_memory={:7.1} MB  samples={}",
                level.concurrency,
                level.throughput_rps.mean,
                level.throughput_rps.std,
                level.avg_memory_mb,
                level.throughput_rps.count
            );
        }

        if !rt.efficiency.is_empty() {
            println!("\n  Scaling Efficiency:");
            for e in &rt.efficiency {
                println!(
                    "    {}x: {:.2}x speedup (efficiency: {:.1}%)",
                    e.concurrency, e.actual_speedup, e.efficiency_pct
                );
            }
        }
    }
}
