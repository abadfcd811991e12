use crate::analyze::{box_stats, compare_means, mean, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::{find_file, LogReader};
use crate::model::{Comparison, StandardStats, SummaryOutput};
use crate::report::chart::{self, runtime_color, Bar, BarSeries, Measure, Reference};
use crate::report::{console, save_chart};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::{ColdStartEntry, Condition, Direction, SampleCollection, StartKind};
use plotters::style::RGBColor;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

const DATA_DIR: &str = "cold-start-comparison";
const DATA_FILE: &str = "cold_start_data.csv";

const RUNTIMES: [&str; 2] = ["docker", "wasmtime"];

const BUILD_COLOR: RGBColor = RGBColor(0xE6, 0x39, 0x46);
const START_COLOR: RGBColor = RGBColor(0x45, 0x7B, 0x9D);
const DOCKER_RUNTIME_COLD: RGBColor = RGBColor(0x85, 0xC1, 0xE9);
const WASMTIME_RUNTIME_COLD: RGBColor = RGBColor(0xFF, 0xAB, 0x91);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColdStartScenario {
    runtime: String,
    kind: StartKind,
    total_ms: StandardStats,
    build_ms_mean: f64,
    start_ms_mean: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColdStartComparisonResult {
    description: String,
    /// Docker against Wasmtime, rather than one runtime against itself
    cross_runtime: bool,
    #[serde(flatten)]
    comparison: Comparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColdStartComparisonSummary {
    scenarios: Vec<ColdStartScenario>,
    comparisons: Vec<ColdStartComparisonResult>,
}

/// The cold start measurements of one runtime in one start scenario
struct ColdStartGroup {
    runtime: &'static str,
    kind: StartKind,
    entries: Vec<ColdStartEntry>,
}

impl ColdStartGroup {
    /// `Docker Full Cold`
    fn title(&self) -> String {
        format!("{} {}", runtime_title(self.runtime), self.kind.title())
    }

    fn description(&self) -> String {
        let detail = match (self.kind, self.runtime) {
            (StartKind::FullCold, _) => "build from source",
            (StartKind::RuntimeCold, "docker") => "pre-built image",
            (StartKind::RuntimeCold, _) => "pre-built component",
        };
        format!(
            "{} ({} - {detail})",
            runtime_title(self.runtime),
            self.kind.title()
        )
    }

    fn totals(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.total_ms).collect()
    }
}

pub(crate) fn summarize_cold_start_comparison(
    config: &AnalysisConfig,
) -> anyhow::Result<ScenarioOutcome> {
    let data_dir = config.raw_dir().join(DATA_DIR);
    let Some(csv_path) = find_file(&data_dir, DATA_FILE) else {
        println!(
            "ERROR: Data file not found: {}",
            data_dir.join(DATA_FILE).display()
        );
        println!("Run the measurement script first:");
        println!("  ./scripts/measure_cold_start_comparison.sh");
        return Ok(ScenarioOutcome::NoData);
    };

    let mut reader = LogReader::new();
    let content = reader.read(&csv_path)?;
    let frame = load_cold_start_frame(content)
        .with_context(|| format!("Failed to load {}", csv_path.display()))?;

    let mut groups = Vec::new();
    for runtime in RUNTIMES {
        for kind in StartKind::ALL {
            let entries = select_entries(&frame, runtime, kind)
                .with_context(|| format!("Cold start entries for {runtime} {kind}"))?;
            groups.push(ColdStartGroup {
                runtime,
                kind,
                entries,
            });
        }
    }

    if groups.iter().all(|g| g.entries.is_empty()) {
        println!("No data found for any scenario.");
        return Ok(ScenarioOutcome::NoData);
    }

    let mut samples = SampleCollection::new();
    for group in &groups {
        samples.extend(group.runtime, Condition::Start(group.kind), group.totals());
    }

    let mut scenarios = Vec::new();
    for group in groups.iter().filter(|g| !g.entries.is_empty()) {
        let total_ms = standard_stats(&group.totals())
            .with_context(|| format!("Total time stats for {}", group.title()))?;
        let build_ms = group.entries.iter().map(|e| e.build_ms).collect::<Vec<_>>();
        let start_ms = group.entries.iter().map(|e| e.start_ms).collect::<Vec<_>>();

        scenarios.push(ColdStartScenario {
            runtime: group.runtime.to_string(),
            kind: group.kind,
            total_ms,
            build_ms_mean: mean(&build_ms)?,
            start_ms_mean: mean(&start_ms)?,
        });
    }

    let comparisons = compare_groups(&groups)?;

    print_summary(&groups, &scenarios, &comparisons);

    config.ensure_out_dir()?;

    let categories = StartKind::ALL
        .iter()
        .map(|kind| kind.title().to_string())
        .collect::<Vec<_>>();
    let series = RUNTIMES
        .iter()
        .map(|runtime| BarSeries {
            name: runtime_title(runtime),
            color: runtime_color(runtime),
            measures: StartKind::ALL
                .iter()
                .map(|kind| {
                    find_scenario(&scenarios, runtime, *kind)
                        .map(|s| Measure::with_error(s.total_ms.mean, s.total_ms.std))
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    save_chart(&config.output_path("cold_warm_comparison_bar.png"), |path| {
        chart::grouped_bar_chart(
            path,
            "Cold Start Comparison: Docker vs Wasmtime",
            "Time to First HTTP 200 (ms)",
            &categories,
            &series,
            None,
        )
    });

    let group_titles = groups.iter().map(|g| g.title()).collect::<Vec<_>>();
    let layers = [
        BarSeries {
            name: "Build Time".to_string(),
            color: BUILD_COLOR,
            measures: groups
                .iter()
                .map(|g| {
                    find_scenario(&scenarios, g.runtime, g.kind)
                        .map(|s| Measure::new(s.build_ms_mean))
                })
                .collect(),
        },
        BarSeries {
            name: "Runtime Start".to_string(),
            color: START_COLOR,
            measures: groups
                .iter()
                .map(|g| {
                    find_scenario(&scenarios, g.runtime, g.kind)
                        .map(|s| Measure::new(s.start_ms_mean))
                })
                .collect(),
        },
    ];
    save_chart(&config.output_path("cold_warm_breakdown_stacked.png"), |path| {
        chart::stacked_bar_chart(
            path,
            "Cold Start Breakdown: Build vs Runtime Start",
            "Time (ms)",
            &group_titles,
            &layers,
        )
    });

    let mut boxes = Vec::new();
    for group in &groups {
        if let Some(values) = samples.get(group.runtime, &Condition::Start(group.kind)) {
            boxes.push((group.title(), group_color(group), box_stats(values)?));
        }
    }
    save_chart(&config.output_path("cold_warm_comparison_boxplot.png"), |path| {
        chart::box_plot(
            path,
            "Cold Start Distribution: Docker vs Wasmtime",
            "Time to First HTTP 200 (ms)",
            &boxes,
        )
    });

    let speedups = comparisons
        .iter()
        .filter(|c| c.cross_runtime)
        .map(|c| {
            let winner = winner_runtime(&c.comparison.winner);
            Bar {
                label: format!(
                    "{} ({} wins)",
                    short_description(&c.description),
                    runtime_title(winner)
                ),
                color: runtime_color(winner),
                measure: Measure::new(c.comparison.ratio),
            }
        })
        .collect::<Vec<_>>();
    if !speedups.is_empty() {
        save_chart(&config.output_path("cold_warm_speedup.png"), |path| {
            chart::bar_chart(
                path,
                "Performance Advantage: Who Wins?",
                "Speedup Factor",
                &speedups,
                Some(&Reference {
                    label: "Parity".to_string(),
                    value: 1.0,
                }),
            )
        });
    }

    let output = SummaryOutput::new(
        Scenario::ColdStartComparison.name(),
        reader.finish(),
        ColdStartComparisonSummary {
            scenarios,
            comparisons,
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}

fn load_cold_start_frame(content: String) -> anyhow::Result<DataFrame> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(content.into_bytes()))
        .finish()?;

    for column in ["runtime", "type", "run", "build_ms", "start_ms", "total_ms"] {
        frame
            .column(column)
            .with_context(|| format!("Missing column `{column}`"))?;
    }

    Ok(frame)
}

fn select_entries(
    frame: &DataFrame,
    runtime: &str,
    kind: StartKind,
) -> anyhow::Result<Vec<ColdStartEntry>> {
    let selected = frame
        .clone()
        .lazy()
        .filter(
            col("runtime")
                .eq(lit(runtime))
                .and(col("type").eq(lit(kind.as_str()))),
        )
        .select([
            col("run").cast(DataType::Int64),
            col("build_ms").cast(DataType::Float64),
            col("start_ms").cast(DataType::Float64),
            col("total_ms").cast(DataType::Float64),
        ])
        .collect()?;

    let runs = selected
        .column("run")?
        .as_materialized_series()
        .i64()?
        .into_iter()
        .map(|v| v.context("Missing value for `run`"))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let build_ms = float_column(&selected, "build_ms")?;
    let start_ms = float_column(&selected, "start_ms")?;
    let total_ms = float_column(&selected, "total_ms")?;

    Ok(runs
        .into_iter()
        .zip(build_ms)
        .zip(start_ms)
        .zip(total_ms)
        .map(|(((run, build_ms), start_ms), total_ms)| ColdStartEntry {
            run,
            build_ms,
            start_ms,
            total_ms,
        })
        .collect())
}

fn float_column(frame: &DataFrame, name: &str) -> anyhow::Result<Vec<f64>> {
    frame
        .column(name)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.with_context(|| format!("Missing value for `{name}`")))
        .collect()
}

fn compare_groups(groups: &[ColdStartGroup]) -> anyhow::Result<Vec<ColdStartComparisonResult>> {
    let find = |runtime: &str, kind: StartKind| {
        groups
            .iter()
            .find(|g| g.runtime == runtime && g.kind == kind && !g.entries.is_empty())
    };

    let pairs = [
        (
            find("docker", StartKind::FullCold),
            find("wasmtime", StartKind::FullCold),
            "Full Cold (build from source)",
            true,
        ),
        (
            find("docker", StartKind::RuntimeCold),
            find("wasmtime", StartKind::RuntimeCold),
            "Runtime Cold (serverless cold start)",
            true,
        ),
        (
            find("docker", StartKind::FullCold),
            find("docker", StartKind::RuntimeCold),
            "Docker: Full Cold vs Runtime Cold",
            false,
        ),
        (
            find("wasmtime", StartKind::FullCold),
            find("wasmtime", StartKind::RuntimeCold),
            "Wasmtime: Full Cold vs Runtime Cold",
            false,
        ),
    ];

    let mut comparisons = Vec::new();
    for (first, second, description, cross_runtime) in pairs {
        let (Some(first), Some(second)) = (first, second) else {
            log::debug!("Skipping comparison {description}, missing data");
            continue;
        };

        let (first_title, second_title) = (first.title(), second.title());
        let comparison = compare_means(
            (first_title.as_str(), mean(&first.totals())?),
            (second_title.as_str(), mean(&second.totals())?),
            Direction::LowerIsBetter,
        );
        comparisons.push(ColdStartComparisonResult {
            description: description.to_string(),
            cross_runtime,
            comparison,
        });
    }

    Ok(comparisons)
}

fn find_scenario<'a>(
    scenarios: &'a [ColdStartScenario],
    runtime: &str,
    kind: StartKind,
) -> Option<&'a ColdStartScenario> {
    scenarios
        .iter()
        .find(|s| s.runtime == runtime && s.kind == kind)
}

fn print_summary(
    groups: &[ColdStartGroup],
    scenarios: &[ColdStartScenario],
    comparisons: &[ColdStartComparisonResult],
) {
    console::print_banner("Cold Start Comparison: Docker vs Wasmtime");

    for group in groups {
        let Some(scenario) = find_scenario(scenarios, group.runtime, group.kind) else {
            continue;
        };
        let stats = &scenario.total_ms;

        println!("\n{}:", group.description());
        println!("  Total time to first HTTP 200:");
        println!("    Mean:   {:>10.2} ms", stats.mean);
        println!("    Median: {:>10.2} ms", stats.median);
        println!("    Stdev:  {:>10.2} ms", stats.std);
        println!("    Min:    {:>10.2} ms", stats.min);
        println!("    Max:    {:>10.2} ms", stats.max);

        if group.kind == StartKind::FullCold {
            println!("  Breakdown:");
            println!("    Build:  {:>10.2} ms (mean)", scenario.build_ms_mean);
            println!("    Start:  {:>10.2} ms (mean)", scenario.start_ms_mean);
        }
    }

    println!("\n{}", "-".repeat(80));
    println!("COMPARISONS:");
    for c in comparisons {
        println!(
            "  {}: {} is {:.1}x faster",
            c.description, c.comparison.winner, c.comparison.ratio
        );
    }
    println!("{}\n", "=".repeat(80));
}

/// `Full Cold (build from source)` -> `Full Cold`
fn short_description(description: &str) -> &str {
    description
        .split_once(" (")
        .map(|(short, _)| short)
        .unwrap_or(description)
}

/// The runtime of a group title, `Wasmtime Full Cold` -> `wasmtime`
fn winner_runtime(winner: &str) -> &'static str {
    RUNTIMES
        .iter()
        .find(|rt| winner.starts_with(runtime_title(rt).as_str()))
        .copied()
        .unwrap_or_default()
}

fn group_color(group: &ColdStartGroup) -> RGBColor {
    match (group.runtime, group.kind) {
        ("docker", StartKind::RuntimeCold) => DOCKER_RUNTIME_COLD,
        ("wasmtime", StartKind::RuntimeCold) => WASMTIME_RUNTIME_COLD,
        (runtime, _) => runtime_color(runtime),
    }
}

fn runtime_title(runtime: &str) -> String {
    let mut chars = runtime.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "runtime,type,run,build_ms,start_ms,total_ms
docker,full_cold,1,9000,500,9500
docker,full_cold,2,11000,500,11500
wasmtime,full_cold,1,3000,20,3020
docker,runtime_cold,1,0,480,480
";

    #[test]
    fn entries_are_selected_by_runtime_and_type() -> anyhow::Result<()> {
        let frame = load_cold_start_frame(CSV.to_string())?;

        let docker_full = select_entries(&frame, "docker", StartKind::FullCold)?;
        assert_eq!(docker_full.len(), 2);
        assert_eq!(docker_full[1].run, 2);
        assert_eq!(docker_full[1].total_ms, 11500.0);

        let wasmtime_runtime = select_entries(&frame, "wasmtime", StartKind::RuntimeCold)?;
        assert!(wasmtime_runtime.is_empty());
        Ok(())
    }

    #[test]
    fn comparisons_skip_missing_groups() -> anyhow::Result<()> {
        let frame = load_cold_start_frame(CSV.to_string())?;
        let groups = RUNTIMES
            .iter()
            .flat_map(|runtime| StartKind::ALL.map(|kind| (*runtime, kind)))
            .map(|(runtime, kind)| {
                Ok(ColdStartGroup {
                    runtime,
                    kind,
                    entries: select_entries(&frame, runtime, kind)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let comparisons = compare_groups(&groups)?;

        let descriptions = comparisons
            .iter()
            .map(|c| c.description.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            descriptions,
            vec![
                "Full Cold (build from source)",
                "Docker: Full Cold vs Runtime Cold"
            ]
        );
        assert_eq!(comparisons[0].comparison.winner, "Wasmtime Full Cold");
        assert!(comparisons[0].comparison.ratio > 3.0);
        assert!(comparisons[0].cross_runtime);
        assert_eq!(winner_runtime(&comparisons[0].comparison.winner), "wasmtime");
        Ok(())
    }

    #[test]
    fn missing_column_is_an_error() {
        let result = load_cold_start_frame("runtime,type,run\ndocker,full_cold,1\n".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn short_descriptions() {
        assert_eq!(short_description("Full Cold (build from source)"), "Full Cold");
        assert_eq!(
            short_description("Docker: Full Cold vs Runtime Cold"),
            "Docker: Full Cold vs Runtime Cold"
        );
    }
}
