use crate::analyze::{box_stats, standard_stats};
use crate::config::AnalysisConfig;
use crate::locate::{find_run_logs, LogReader};
use crate::model::{BoxStats, RuntimeStats};
use crate::report::chart::runtime_color;
use anyhow::Context;
use bench_summary_model::{Condition, SampleCollection};
use plotters::style::RGBColor;
use std::path::Path;

mod cold_start_comparison;
mod cpu_hash;
mod cpu_hash_scaling;
mod http_hello;
mod http_hello_scaling;
mod http_hello_stateful;
mod native_http_hello;
mod summary;
mod wasm_hello;

pub(crate) use cold_start_comparison::summarize_cold_start_comparison;
pub(crate) use cpu_hash::summarize_cpu_hash;
pub(crate) use cpu_hash_scaling::summarize_cpu_hash_scaling;
pub(crate) use http_hello::summarize_http_hello;
pub(crate) use http_hello_scaling::summarize_http_hello_scaling;
pub(crate) use http_hello_stateful::summarize_http_hello_stateful;
pub(crate) use native_http_hello::summarize_native_http_hello;
pub(crate) use summary::summarize_benchmarks;
pub(crate) use wasm_hello::summarize_wasm_hello;

/// Runtimes with fewer samples than this get a warning
const FEW_SAMPLES: usize = 3;
const RECOMMENDED_SAMPLES: usize = 5;

/// A runtime and the directory under `results/raw` that its logs are written to
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuntimeSource {
    pub name: &'static str,
    pub dir: &'static str,
}

impl RuntimeSource {
    pub const fn new(name: &'static str, dir: &'static str) -> Self {
        Self { name, dir }
    }
}

/// Parse every run log of one benchmark for one runtime, in file name order.
///
/// Warns when nothing was found, a runtime without data is skipped rather than failing the
/// scenario.
pub(crate) fn read_runtime_logs<T, F>(
    config: &AnalysisConfig,
    reader: &mut LogReader,
    benchmark: &str,
    source: &RuntimeSource,
    mut parse: F,
) -> anyhow::Result<Vec<T>>
where
    F: FnMut(&Path, &str) -> anyhow::Result<Vec<T>>,
{
    let dir = config.benchmark_dir(source.dir, benchmark);

    let mut items = Vec::new();
    for path in find_run_logs(&dir) {
        let content = reader.read(&path)?;
        let parsed = parse(&path, &content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::trace!("Parsed {} entries from {}", parsed.len(), path.display());
        items.extend(parsed);
    }

    if items.is_empty() {
        log::warn!(
            "No {benchmark} samples for {} in {}",
            source.name,
            dir.display()
        );
    }

    Ok(items)
}

pub(crate) fn warn_few_samples(runtime: &str, count: usize) {
    if count < FEW_SAMPLES {
        log::warn!(
            "Only {count} samples for {runtime}. Recommend at least {RECOMMENDED_SAMPLES} for statistical validity."
        );
    }
}

/// Statistics of every runtime that has samples under `condition`, in runtime order.
pub(crate) fn runtime_stats(
    collection: &SampleCollection,
    condition: &Condition,
) -> anyhow::Result<Vec<RuntimeStats>> {
    collection
        .runtimes()
        .into_iter()
        .filter_map(|runtime| collection.get(runtime, condition).map(|v| (runtime, v)))
        .map(|(runtime, values)| {
            Ok(RuntimeStats {
                runtime: runtime.to_string(),
                stats: standard_stats(values)
                    .with_context(|| format!("Stats for {runtime} ({condition})"))?,
            })
        })
        .collect()
}

/// Box plot input for every runtime that has samples under `condition`.
pub(crate) fn runtime_boxes(
    collection: &SampleCollection,
    condition: &Condition,
) -> anyhow::Result<Vec<(String, RGBColor, BoxStats)>> {
    collection
        .runtimes()
        .into_iter()
        .filter_map(|runtime| collection.get(runtime, condition).map(|v| (runtime, v)))
        .map(|(runtime, values)| {
            Ok((
                runtime.to_string(),
                runtime_color(runtime),
                box_stats(values)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_runtime_directory_is_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AnalysisConfig::new(dir.path());
        let mut reader = LogReader::new();

        let values: Vec<f64> = read_runtime_logs(
            &config,
            &mut reader,
            "cpu-hash",
            &RuntimeSource::new("native", "native"),
            |_, _| Ok(vec![1.0]),
        )?;

        assert!(values.is_empty());
        assert_eq!(reader.files_read(), 0);
        Ok(())
    }

    #[test]
    fn logs_are_read_in_name_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AnalysisConfig::new(dir.path());
        let logs = config.benchmark_dir("wasm", "cpu-hash");
        std::fs::create_dir_all(&logs)?;
        std::fs::write(logs.join("2024-01-02T00-00-00Z_run.log"), "2")?;
        std::fs::write(logs.join("2024-01-01T00-00-00Z_run.log"), "1")?;
        let mut reader = LogReader::new();

        let values = read_runtime_logs(
            &config,
            &mut reader,
            "cpu-hash",
            &RuntimeSource::new("wasmtime", "wasm"),
            |_, content| Ok(vec![content.parse::<f64>()?]),
        )?;

        assert_eq!(values, vec![1.0, 2.0]);
        assert_eq!(reader.files_read(), 2);
        Ok(())
    }

    #[test]
    fn stats_follow_runtime_order() -> anyhow::Result<()> {
        let mut collection = SampleCollection::new();
        collection.extend("wasmtime", Condition::Unconditioned, [3.0, 5.0]);
        collection.extend("native", Condition::Unconditioned, [1.0]);
        collection.extend("native", Condition::Concurrency(2), [7.0]);

        let stats = runtime_stats(&collection, &Condition::Unconditioned)?;

        let runtimes = stats.iter().map(|s| s.runtime.as_str()).collect::<Vec<_>>();
        assert_eq!(runtimes, vec!["wasmtime", "native"]);
        assert_eq!(stats[0].stats.mean, 4.0);
        assert_eq!(runtime_boxes(&collection, &Condition::Concurrency(2))?.len(), 1);
        Ok(())
    }
}
