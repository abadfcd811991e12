use crate::analyze::{box_stats, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::{find_run_logs, LogReader};
use crate::model::{StandardStats, SummaryOutput};
use crate::parse::parse_run_record;
use crate::report::chart::{self, runtime_color, Line, Measure};
use crate::report::save_chart;
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const RUNTIME: &str = "native";
const BENCHMARK: &str = "http-hello";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeRun {
    run_id: String,
    cold_start_ms: f64,
    latency_ms: StandardStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeHttpHelloSummary {
    runs: Vec<NativeRun>,
    cold_start_ms: StandardStats,
    latency_ms: StandardStats,
}

pub(crate) fn summarize_native_http_hello(
    config: &AnalysisConfig,
) -> anyhow::Result<ScenarioOutcome> {
    let dir = config.benchmark_dir(RUNTIME, BENCHMARK);
    let run_logs = find_run_logs(&dir);
    if run_logs.is_empty() {
        println!("No run logs found in {}", dir.display());
        return Ok(ScenarioOutcome::NoData);
    }

    let mut reader = LogReader::new();
    let mut records = Vec::new();
    for path in &run_logs {
        let content = reader.read(path)?;
        if let Some(record) = parse_run_record(path, &content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
        {
            records.push(record);
        }
    }

    if records.is_empty() {
        println!("No valid runs parsed.");
        return Ok(ScenarioOutcome::NoData);
    }

    let mut runs = Vec::with_capacity(records.len());
    println!("Parsed runs:");
    for (index, record) in records.iter().enumerate() {
        let latency_ms = standard_stats(&record.latencies_ms)
            .with_context(|| format!("Latency stats for run {}", record.run_id))?;
        println!(
            "Run {:02} ({}): cold_start_ms={:.3}, latency_ms mean={:.3}, p50={:.3}, min={:.3}, max={:.3}",
            index + 1,
            record.run_id,
            record.cold_start_ms,
            latency_ms.mean,
            latency_ms.median,
            latency_ms.min,
            latency_ms.max
        );
        runs.push(NativeRun {
            run_id: record.run_id.clone(),
            cold_start_ms: record.cold_start_ms,
            latency_ms,
        });
    }

    let cold_starts = records.iter().map(|r| r.cold_start_ms).collect::<Vec<_>>();
    let all_latencies = records
        .iter()
        .flat_map(|r| r.latencies_ms.iter().copied())
        .collect::<Vec<_>>();

    config.ensure_out_dir()?;

    let cold_start_line = Line {
        name: RUNTIME.to_string(),
        color: runtime_color(RUNTIME),
        points: cold_starts
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1) as f64, Measure::new(*v)))
            .collect(),
    };
    save_chart(&config.output_path("native_http_hello_cold_start_ms.png"), |path| {
        chart::line_chart(
            path,
            "Native http-hello cold start per run",
            "Run index",
            "Cold start (ms)",
            &[cold_start_line],
            None,
        )
    });

    let latency_box = (
        RUNTIME.to_string(),
        runtime_color(RUNTIME),
        box_stats(&all_latencies)?,
    );
    save_chart(&config.output_path("native_http_hello_latency_boxplot_ms.png"), |path| {
        chart::box_plot(
            path,
            "Native http-hello request latency (all runs)",
            "Latency (ms)",
            &[latency_box],
        )
    });

    let points = records
        .iter()
        .enumerate()
        .flat_map(|(i, r)| r.latencies_ms.iter().map(move |l| ((i + 1) as f64, *l)))
        .collect::<Vec<_>>();
    save_chart(&config.output_path("native_http_hello_latency_scatter_ms.png"), |path| {
        chart::scatter_chart(
            path,
            "Native http-hello per-run latency scatter",
            "Run index",
            "Latency (ms)",
            &points,
        )
    });

    let output = SummaryOutput::new(
        Scenario::NativeHttpHello.name(),
        reader.finish(),
        NativeHttpHelloSummary {
            runs,
            cold_start_ms: standard_stats(&cold_starts).context("Cold start stats")?,
            latency_ms: standard_stats(&all_latencies).context("Latency stats")?,
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}
