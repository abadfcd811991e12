use crate::analyze::{scaling_efficiency, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::LogReader;
use crate::model::{ConcurrencyStats, ScalingEfficiency, SummaryOutput};
use crate::parse::parse_cpu_scaling;
use crate::report::chart::{self, runtime_color, Line, Measure};
use crate::report::save_chart;
use crate::scenario::{read_runtime_logs, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::{Condition, MetricUnit, SampleCollection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BENCHMARK: &str = "cpu-hash-scaling";

const RUNTIMES: [RuntimeSource; 4] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasm"),
    RuntimeSource::new("wasmedge", "wasmedge"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuntimeScaling {
    runtime: String,
    throughput: Vec<ConcurrencyStats>,
    efficiency: Vec<ScalingEfficiency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CpuHashScalingSummary {
    unit: MetricUnit,
    runtimes: Vec<RuntimeScaling>,
}

pub(crate) fn summarize_cpu_hash_scaling(
    config: &AnalysisConfig,
) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut samples = SampleCollection::new();

    for source in &RUNTIMES {
        let lines = read_runtime_logs(config, &mut reader, BENCHMARK, source, parse_cpu_scaling)?;
        for (concurrency, throughput) in lines {
            samples.push_value(source.name, Condition::Concurrency(concurrency), throughput);
        }
    }

    if samples.is_empty() {
        println!("No cpu-hash scaling data found.");
        return Ok(ScenarioOutcome::NoData);
    }

    let mut runtimes = Vec::new();
    for runtime in samples.runtimes() {
        let mut throughput = Vec::new();
        for condition in samples.conditions(runtime) {
            let (Condition::Concurrency(concurrency), Some(values)) =
                (condition, samples.get(runtime, condition))
            else {
                continue;
            };
            throughput.push(ConcurrencyStats {
                concurrency: *concurrency,
                stats: standard_stats(values)
                    .with_context(|| format!("Throughput stats for {runtime} {condition}"))?,
            });
        }

        let means = throughput
            .iter()
            .map(|c| (c.concurrency, c.stats.mean))
            .collect::<BTreeMap<_, _>>();

        runtimes.push(RuntimeScaling {
            runtime: runtime.to_string(),
            efficiency: scaling_efficiency(&means),
            throughput,
        });
    }

    println!("CPU-hash scaling summary (throughput_iter_s):");
    for rt in &runtimes {
        for c in &rt.throughput {
            println!(
                "- {} conc={}: mean={:.3} min={:.3} max={:.3} n={}",
                rt.runtime, c.concurrency, c.stats.mean, c.stats.min, c.stats.max, c.stats.count
            );
        }
        for e in &rt.efficiency {
            println!(
                "  {} conc={}: {:.2}x speedup (efficiency: {:.1}%)",
                rt.runtime, e.concurrency, e.actual_speedup, e.efficiency_pct
            );
        }
    }

    config.ensure_out_dir()?;

    let lines = runtimes
        .iter()
        .map(|rt| Line {
            name: rt.runtime.clone(),
            color: runtime_color(&rt.runtime),
            points: rt
                .throughput
                .iter()
                .map(|c| (f64::from(c.concurrency), Measure::new(c.stats.mean)))
                .collect(),
        })
        .collect::<Vec<_>>();
    save_chart(&config.output_path("cpu_hash_scaling_throughput.png"), |path| {
        chart::line_chart(
            path,
            "CPU-hash scaling throughput by runtime",
            "Concurrency (instances)",
            "Throughput (iterations/sec)",
            &lines,
            None,
        )
    });

    let output = SummaryOutput::new(
        Scenario::CpuHashScaling.name(),
        reader.finish(),
        CpuHashScalingSummary {
            unit: MetricUnit::IterationsPerSecond,
            runtimes,
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}
