use crate::config::AnalysisConfig;
use crate::locate::LogReader;
use crate::model::{RuntimeStats, SummaryOutput};
use crate::parse::{capture_values, Field};
use crate::report::chart::{self, runtime_color, Bar, Measure};
use crate::report::save_chart;
use crate::scenario::{read_runtime_logs, runtime_boxes, runtime_stats, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use bench_summary_model::{Condition, MetricUnit, SampleCollection};
use serde::{Deserialize, Serialize};

const BENCHMARK: &str = "hello-wasm";

const RUNTIMES: [RuntimeSource; 2] = [
    RuntimeSource::new("wasmtime", "wasm"),
    RuntimeSource::new("wasmedge", "wasmedge"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WasmHelloSummary {
    unit: MetricUnit,
    elapsed: Vec<RuntimeStats>,
}

pub(crate) fn summarize_wasm_hello(config: &AnalysisConfig) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut samples = SampleCollection::new();

    for source in &RUNTIMES {
        let values = read_runtime_logs(config, &mut reader, BENCHMARK, source, |path, content| {
            capture_values(path, content, Field::ElapsedMs)
        })?;
        samples.extend(source.name, Condition::Unconditioned, values);
    }

    if samples.is_empty() {
        println!("No hello-wasm data found.");
        return Ok(ScenarioOutcome::NoData);
    }

    let elapsed = runtime_stats(&samples, &Condition::Unconditioned)?;

    println!("hello-wasm summary (elapsed_ms):");
    for rt in &elapsed {
        println!(
            "- {}: mean={:.3} ms, p50={:.3} ms, min={:.3}, max={:.3}, n={}",
            rt.runtime, rt.stats.mean, rt.stats.median, rt.stats.min, rt.stats.max, rt.stats.count
        );
    }

    config.ensure_out_dir()?;

    let boxes = runtime_boxes(&samples, &Condition::Unconditioned)?;
    save_chart(&config.output_path("hello_wasm_elapsed_ms_boxplot.png"), |path| {
        chart::box_plot(
            path,
            "hello-wasm execution time by runtime",
            "Execution time (ms)",
            &boxes,
        )
    });

    let bars = elapsed
        .iter()
        .map(|rt| Bar {
            label: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            measure: Measure::new(rt.stats.mean),
        })
        .collect::<Vec<_>>();
    save_chart(&config.output_path("hello_wasm_elapsed_ms_bar.png"), |path| {
        chart::bar_chart(
            path,
            "hello-wasm mean execution time by runtime",
            "Execution time (ms)",
            &bars,
            None,
        )
    });

    let output = SummaryOutput::new(
        Scenario::WasmHello.name(),
        reader.finish(),
        WasmHelloSummary {
            unit: MetricUnit::Milliseconds,
            elapsed,
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}
