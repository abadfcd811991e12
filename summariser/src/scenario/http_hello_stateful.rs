use crate::analyze::{box_stats, overhead_pct, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::LogReader;
use crate::model::{StandardStats, SummaryOutput};
use crate::parse::{parse_path_latencies, DEFAULT_PATH};
use crate::report::chart::{self, Bar, Measure, Reference};
use crate::report::{console, save_chart};
use crate::scenario::{read_runtime_logs, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::{Condition, SampleCollection};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

const BENCHMARK: &str = "http-hello";
const STATEFUL_PATH: &str = "/state";

const STATELESS_COLOR: RGBColor = RGBColor(0xAD, 0xD8, 0xE6);
const STATEFUL_COLOR: RGBColor = RGBColor(0xF0, 0x80, 0x80);
const OVERHEAD_COLOR: RGBColor = RGBColor(0xD6, 0x27, 0x28);
const SAVING_COLOR: RGBColor = RGBColor(0x2C, 0xA0, 0x2C);

const RUNTIMES: [RuntimeSource; 3] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasmtime"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuntimeEndpoints {
    runtime: String,
    paths: Vec<String>,
    stateless: Option<StandardStats>,
    stateful: Option<StandardStats>,
    /// Extra latency of the stateful endpoint, when both were measured
    overhead_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpHelloStatefulSummary {
    runtimes: Vec<RuntimeEndpoints>,
}

pub(crate) fn summarize_http_hello_stateful(
    config: &AnalysisConfig,
) -> anyhow::Result<ScenarioOutcome> {
    let mut reader = LogReader::new();
    let mut samples = SampleCollection::new();

    for source in &RUNTIMES {
        let latencies =
            read_runtime_logs(config, &mut reader, BENCHMARK, source, parse_path_latencies)?;
        for (path, latency) in latencies {
            samples.push_value(source.name, Condition::Path(path), latency);
        }
    }

    if samples.is_empty() {
        println!("ERROR: No http-hello data found.");
        println!("\nMake sure to run benchmarks for both endpoints:");
        println!("  ./scripts/measure_native_http_hello.sh  # stateless");
        println!("  PATH_SUFFIX=/state ./scripts/measure_native_http_hello.sh  # stateful");
        return Ok(ScenarioOutcome::NoData);
    }

    let stateless_condition = Condition::Path(DEFAULT_PATH.to_string());
    let stateful_condition = Condition::Path(STATEFUL_PATH.to_string());

    let has_stateful = samples
        .runtimes()
        .into_iter()
        .any(|rt| samples.get(rt, &stateful_condition).is_some());
    if !has_stateful {
        log::warn!("No /state endpoint data found in any runtime.");
        println!("Run benchmarks with PATH_SUFFIX=/state to collect stateful data:");
        for source in &RUNTIMES {
            println!(
                "  PATH_SUFFIX=/state ./scripts/measure_{}_http_hello.sh",
                source.dir
            );
        }
    }

    let mut runtimes = Vec::new();
    for runtime in samples.runtimes() {
        let stateless = samples
            .get(runtime, &stateless_condition)
            .map(standard_stats)
            .transpose()
            .with_context(|| format!("Stateless stats for {runtime}"))?;
        let stateful = samples
            .get(runtime, &stateful_condition)
            .map(standard_stats)
            .transpose()
            .with_context(|| format!("Stateful stats for {runtime}"))?;
        let overhead_pct = match (&stateless, &stateful) {
            (Some(stateless), Some(stateful)) => Some(overhead_pct(stateless.mean, stateful.mean)),
            _ => None,
        };

        runtimes.push(RuntimeEndpoints {
            runtime: runtime.to_string(),
            paths: samples
                .conditions(runtime)
                .into_iter()
                .filter_map(|c| match c {
                    Condition::Path(path) => Some(path.clone()),
                    _ => None,
                })
                .collect(),
            stateless,
            stateful,
            overhead_pct,
        });
    }

    print_summary(&runtimes);

    config.ensure_out_dir()?;

    let mut boxes = Vec::new();
    for runtime in samples.runtimes() {
        if let Some(values) = samples.get(runtime, &stateless_condition) {
            boxes.push((
                format!("{runtime} (stateless)"),
                STATELESS_COLOR,
                box_stats(values)?,
            ));
        }
        if let Some(values) = samples.get(runtime, &stateful_condition) {
            boxes.push((
                format!("{runtime} (stateful)"),
                STATEFUL_COLOR,
                box_stats(values)?,
            ));
        }
    }
    save_chart(
        &config.output_path("http_hello_stateful_comparison_boxplot.png"),
        |path| {
            chart::box_plot(
                path,
                "Stateless vs Stateful Endpoint Latency Comparison",
                "Latency (ms)",
                &boxes,
            )
        },
    );

    let bars = runtimes
        .iter()
        .filter_map(|rt| {
            rt.overhead_pct.map(|overhead| Bar {
                label: rt.runtime.clone(),
                color: if overhead > 0.0 {
                    OVERHEAD_COLOR
                } else {
                    SAVING_COLOR
                },
                measure: Measure::new(overhead),
            })
        })
        .collect::<Vec<_>>();
    if bars.is_empty() {
        log::warn!("No runtime has both stateless and stateful data for overhead chart");
    } else {
        save_chart(&config.output_path("http_hello_state_overhead.png"), |path| {
            chart::bar_chart(
                path,
                "State Management Overhead by Runtime",
                "Overhead (%)",
                &bars,
                Some(&Reference {
                    label: "No overhead".to_string(),
                    value: 0.0,
                }),
            )
        });
    }

    let output = SummaryOutput::new(
        Scenario::HttpHelloStateful.name(),
        reader.finish(),
        HttpHelloStatefulSummary { runtimes },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}

fn print_summary(runtimes: &[RuntimeEndpoints]) {
    console::print_banner("STATEFUL VS STATELESS ENDPOINT COMPARISON");

    for rt in runtimes {
        println!("\n{}:", rt.runtime.to_uppercase());
        println!("{}", "-".repeat(80));

        match (&rt.stateless, &rt.stateful, rt.overhead_pct) {
            (Some(stateless), Some(stateful), Some(overhead)) => {
                for (title, stats) in [
                    ("Stateless (/)", stateless),
                    ("Stateful (/state)", stateful),
                ] {
                    println!("  {title}:");
                    println!("    Mean:   {:7.3} ± {:6.3} ms", stats.mean, stats.std);
                    println!("    Median: {:7.3} ms", stats.median);
                    println!("    Samples: {}", stats.count);
                }
                println!("  State Management Overhead: {overhead:+.1}%");
            }
            _ => {
                println!("  Paths found: {:?}", rt.paths);
                if rt.stateful.is_none() {
                    log::warn!(
                        "No /state endpoint data found for {}. Run with PATH_SUFFIX=/state",
                        rt.runtime
                    );
                }
            }
        }
    }
}
