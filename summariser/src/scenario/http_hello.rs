use crate::analyze::{box_stats, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::LogReader;
use crate::model::{StandardStats, SummaryOutput};
use crate::parse::parse_run_record;
use crate::report::chart::{self, runtime_color, Bar, Measure};
use crate::report::save_chart;
use crate::scenario::{read_runtime_logs, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::RunRecord;
use serde::{Deserialize, Serialize};

const BENCHMARK: &str = "http-hello";

const RUNTIMES: [RuntimeSource; 4] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmcloud_full", "wasmcloud"),
    RuntimeSource::new("wasmcloud_comp", "wasmcloud-component"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuntimeHttpStats {
    runtime: String,
    runs: usize,
    cold_start_ms: StandardStats,
    latency_ms: StandardStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpHelloSummary {
    runtimes: Vec<RuntimeHttpStats>,
}

pub(crate) fn summarize_http_hello(config: &AnalysisConfig) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut data: Vec<(&str, Vec<RunRecord>)> = Vec::new();

    for source in &RUNTIMES {
        let runs = read_runtime_logs(config, &mut reader, BENCHMARK, source, |path, content| {
            Ok(parse_run_record(path, content)?.into_iter().collect())
        })?;
        if !runs.is_empty() {
            data.push((source.name, runs));
        }
    }

    if data.is_empty() {
        println!("No data found for any runtime.");
        return Ok(ScenarioOutcome::NoData);
    }

    let mut runtimes = Vec::new();
    let mut latencies = Vec::new();
    for (runtime, runs) in &data {
        let cold_starts = runs.iter().map(|r| r.cold_start_ms).collect::<Vec<_>>();
        let all_latencies = runs
            .iter()
            .flat_map(|r| r.latencies_ms.iter().copied())
            .collect::<Vec<_>>();

        runtimes.push(RuntimeHttpStats {
            runtime: runtime.to_string(),
            runs: runs.len(),
            cold_start_ms: standard_stats(&cold_starts)
                .with_context(|| format!("Cold start stats for {runtime}"))?,
            latency_ms: standard_stats(&all_latencies)
                .with_context(|| format!("Latency stats for {runtime}"))?,
        });
        latencies.push((
            runtime.to_string(),
            runtime_color(runtime),
            box_stats(&all_latencies)?,
        ));
    }

    println!("Summary per runtime:");
    for rt in &runtimes {
        println!(
            "- {}: cold_start_ms mean={:.3}, min={:.3}, max={:.3}; latency_ms mean={:.3}, p50={:.3}, min={:.3}, max={:.3}",
            rt.runtime,
            rt.cold_start_ms.mean,
            rt.cold_start_ms.min,
            rt.cold_start_ms.max,
            rt.latency_ms.mean,
            rt.latency_ms.median,
            rt.latency_ms.min,
            rt.latency_ms.max
        );
    }

    config.ensure_out_dir()?;

    let bars = runtimes
        .iter()
        .map(|rt| Bar {
            label: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            measure: Measure::new(rt.cold_start_ms.mean),
        })
        .collect::<Vec<_>>();
    save_chart(&config.output_path("http_hello_cold_start_mean_by_runtime.png"), |path| {
        chart::bar_chart(
            path,
            "HTTP hello cold start, mean per runtime",
            "Cold start (ms)",
            &bars,
            None,
        )
    });

    save_chart(&config.output_path("http_hello_latency_boxplot_by_runtime.png"), |path| {
        chart::box_plot(
            path,
            "HTTP hello per-request latency by runtime",
            "Latency (ms)",
            &latencies,
        )
    });

    let output = SummaryOutput::new(
        Scenario::HttpHello.name(),
        reader.finish(),
        HttpHelloSummary { runtimes },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}
