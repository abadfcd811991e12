use crate::analyze::pairwise_significance;
use crate::config::AnalysisConfig;
use crate::locate::LogReader;
use crate::model::{PairComparison, RuntimeStats, SummaryOutput};
use crate::parse::{capture_values, Field};
use crate::report::chart::{self, runtime_color, Bar, Measure};
use crate::report::{console, save_chart};
use crate::scenario::{
    read_runtime_logs, runtime_boxes, runtime_stats, warn_few_samples, RuntimeSource,
};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::{Condition, MetricUnit, SampleCollection};
use serde::{Deserialize, Serialize};

const BENCHMARK: &str = "cpu-hash";

const RUNTIMES: [RuntimeSource; 4] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasm"),
    RuntimeSource::new("wasmedge", "wasmedge"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CpuHashSummary {
    unit: MetricUnit,
    execution_time: Vec<RuntimeStats>,
    significance: Vec<PairComparison>,
}

pub(crate) fn summarize_cpu_hash(config: &AnalysisConfig) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut samples = SampleCollection::new();

    for source in &RUNTIMES {
        let values = read_runtime_logs(config, &mut reader, BENCHMARK, source, |path, content| {
            capture_values(path, content, Field::OuterMs)
        })?;
        if !values.is_empty() {
            warn_few_samples(source.name, values.len());
        }
        samples.extend(source.name, Condition::Unconditioned, values);
    }

    if samples.is_empty() {
        println!("No cpu-hash data found.");
        return Ok(ScenarioOutcome::NoData);
    }

    let execution_time =
        runtime_stats(&samples, &Condition::Unconditioned).context("Execution time stats")?;

    console::print_banner("CPU-HASH SUMMARY (execution time)");
    for rt in &execution_time {
        let s = &rt.stats;
        let ci = s
            .confidence_interval
            .map(|ci| format!(", 95% CI=[{:.3}, {:.3}]", ci.lower, ci.upper))
            .unwrap_or_default();
        println!(
            "- {:<10}: mean={:7.3} ± {:6.3} ms, median={:7.3} ms, range=[{:.3}, {:.3}], n={}{ci}",
            rt.runtime, s.mean, s.std, s.median, s.min, s.max, s.count
        );
    }
    console::print_stats_table("Execution time", MetricUnit::Milliseconds.label(), &execution_time);

    let by_runtime = samples
        .runtimes()
        .into_iter()
        .filter_map(|rt| samples.get(rt, &Condition::Unconditioned).map(|v| (rt, v)))
        .collect::<Vec<_>>();
    let significance = pairwise_significance(&by_runtime).context("Significance tests")?;
    console::print_significance(&significance);

    config.ensure_out_dir()?;

    let boxes = runtime_boxes(&samples, &Condition::Unconditioned)?;
    save_chart(&config.output_path("cpu_hash_outer_ms_boxplot.png"), |path| {
        chart::box_plot(
            path,
            "CPU-hash execution time by runtime",
            "Execution time (ms)",
            &boxes,
        )
    });

    let bars = execution_time
        .iter()
        .map(|rt| Bar {
            label: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            measure: Measure::with_error(rt.stats.mean, rt.stats.std),
        })
        .collect::<Vec<_>>();
    save_chart(&config.output_path("cpu_hash_outer_ms_bar.png"), |path| {
        chart::bar_chart(
            path,
            "CPU-hash mean execution time by runtime (±1 std dev)",
            "Execution time (ms)",
            &bars,
            None,
        )
    });

    let output = SummaryOutput::new(
        Scenario::CpuHash.name(),
        reader.finish(),
        CpuHashSummary {
            unit: MetricUnit::Milliseconds,
            execution_time,
            significance,
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}
