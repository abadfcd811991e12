use crate::config::AnalysisConfig;
use crate::locate::{find_run_logs, LogReader};
use crate::model::SummaryOutput;
use crate::parse::{capture_values, Field};
use crate::report::document::{
    executive_summary, latex_summary, markdown_summary, BenchmarkSection, SummaryMetric,
};
use crate::report::write_text;
use crate::scenario::{runtime_stats, RuntimeSource};
use crate::{Scenario, ScenarioOutcome};
use anyhow::Context;
use bench_summary_model::{Condition, SampleCollection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const KB_PER_MB: f64 = 1024.0;

const HTTP_RUNTIMES: [RuntimeSource; 3] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasmtime"),
];

const CPU_RUNTIMES: [RuntimeSource; 4] = [
    RuntimeSource::new("native", "native"),
    RuntimeSource::new("docker", "docker"),
    RuntimeSource::new("wasmtime", "wasm"),
    RuntimeSource::new("wasmedge", "wasmedge"),
];

/// Where the samples of a summary metric come from
struct MetricSource {
    metric: SummaryMetric,
    benchmark: &'static str,
    runtimes: &'static [RuntimeSource],
    field: Field,
    scale: f64,
}

impl MetricSource {
    fn for_metric(metric: SummaryMetric) -> Self {
        let (benchmark, runtimes, field, scale): (_, &'static [RuntimeSource], _, _) = match metric
        {
            SummaryMetric::ColdStart => ("http-hello", &HTTP_RUNTIMES, Field::ColdStartMs, 1.0),
            SummaryMetric::HttpLatency => ("http-hello", &HTTP_RUNTIMES, Field::LatencyMs, 1.0),
            SummaryMetric::HttpThroughput => {
                ("http-hello", &HTTP_RUNTIMES, Field::ThroughputRps, 1.0)
            }
            SummaryMetric::MemoryUsage => {
                ("http-hello", &HTTP_RUNTIMES, Field::RssKb, 1.0 / KB_PER_MB)
            }
            SummaryMetric::CpuHash => ("cpu-hash", &CPU_RUNTIMES, Field::OuterMs, 1.0),
        };

        Self {
            metric,
            benchmark,
            runtimes,
            field,
            scale,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchmarkSummary {
    sections: Vec<BenchmarkSection>,
    reports: Vec<PathBuf>,
}

/// Reads each log once even when several metrics are taken from it.
struct CachedReader {
    reader: LogReader,
    contents: HashMap<PathBuf, String>,
}

impl CachedReader {
    fn new() -> Self {
        Self {
            reader: LogReader::new(),
            contents: HashMap::new(),
        }
    }

    fn read(&mut self, path: &Path) -> anyhow::Result<&str> {
        if !self.contents.contains_key(path) {
            let content = self.reader.read(path)?;
            self.contents.insert(path.to_path_buf(), content);
        }
        Ok(self.contents.get(path).map(String::as_str).unwrap_or_default())
    }
}

pub(crate) fn summarize_benchmarks(config: &AnalysisConfig) -> anyhow::Result<ScenarioOutcome> {
    println!("Collecting benchmark results...");

    let mut reader = CachedReader::new();
    let mut sections = Vec::new();
    for metric in SummaryMetric::ALL {
        let source = MetricSource::for_metric(metric);
        let samples = collect_metric(config, &mut reader, &source)
            .with_context(|| format!("Collect {} samples", metric.title()))?;
        sections.push(BenchmarkSection {
            metric,
            stats: runtime_stats(&samples, &Condition::Unconditioned)?,
        });
    }

    if sections.iter().all(|s| s.stats.is_empty()) {
        println!("No benchmark results found under {}", config.raw_dir().display());
        return Ok(ScenarioOutcome::NoData);
    }

    log::debug!("Read {} log files", reader.reader.files_read());
    println!("\nGenerating summary reports...");
    config.ensure_out_dir()?;

    let markdown_path = config.output_path("benchmark_summary.md");
    write_text(&markdown_path, &markdown_summary(&sections))?;
    println!("  Markdown summary: {}", markdown_path.display());

    let latex_path = config.output_path("benchmark_summary.tex");
    write_text(&latex_path, &latex_summary(&sections))?;
    println!("  LaTeX table: {}", latex_path.display());

    let executive = executive_summary(&sections);
    let executive_path = config.output_path("executive_summary.txt");
    write_text(&executive_path, &executive)?;
    println!("  Executive summary: {}", executive_path.display());

    println!("\n{executive}");

    let output = SummaryOutput::new(
        Scenario::Summary.name(),
        reader.reader.finish(),
        BenchmarkSummary {
            sections,
            reports: vec![markdown_path, latex_path, executive_path],
        },
    )?;

    Ok(ScenarioOutcome::Completed(output))
}

fn collect_metric(
    config: &AnalysisConfig,
    reader: &mut CachedReader,
    source: &MetricSource,
) -> anyhow::Result<SampleCollection> {
    let mut samples = SampleCollection::new();

    for runtime in source.runtimes {
        let dir = config.benchmark_dir(runtime.dir, source.benchmark);
        for path in find_run_logs(&dir) {
            let content = reader.read(&path)?;
            let values = capture_values(&path, content, source.field)?;
            samples.extend(
                runtime.name,
                Condition::Unconditioned,
                values.into_iter().map(|v| v * source.scale),
            );
        }

        let count = samples
            .get(runtime.name, &Condition::Unconditioned)
            .map(<[f64]>::len)
            .unwrap_or(0);
        if count > 0 {
            println!(
                "  {} / {}: {count} samples",
                source.metric.title(),
                runtime.name
            );
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_reported_in_megabytes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AnalysisConfig::new(dir.path());
        let logs = config.benchmark_dir("docker", "http-hello");
        std::fs::create_dir_all(&logs)?;
        std::fs::write(
            logs.join("2024-01-01T00-00-00Z_run.log"),
            "cold_start_ms=12.5\nrss_kb=2048\n",
        )?;

        let mut reader = CachedReader::new();
        let memory = collect_metric(
            &config,
            &mut reader,
            &MetricSource::for_metric(SummaryMetric::MemoryUsage),
        )?;
        let cold_start = collect_metric(
            &config,
            &mut reader,
            &MetricSource::for_metric(SummaryMetric::ColdStart),
        )?;

        assert_eq!(
            memory.get("docker", &Condition::Unconditioned),
            Some([2.0].as_slice())
        );
        assert_eq!(
            cold_start.get("docker", &Condition::Unconditioned),
            Some([12.5].as_slice())
        );
        assert_eq!(reader.reader.files_read(), 1);
        Ok(())
    }

    #[test]
    fn cpu_hash_reads_wasm_directory_as_wasmtime() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AnalysisConfig::new(dir.path());
        let logs = config.benchmark_dir("wasm", "cpu-hash");
        std::fs::create_dir_all(&logs)?;
        std::fs::write(logs.join("a_run.log"), "outer_ms=5.0\nouter_ms=7.0\n")?;

        let samples = collect_metric(
            &config,
            &mut CachedReader::new(),
            &MetricSource::for_metric(SummaryMetric::CpuHash),
        )?;

        assert_eq!(samples.runtimes(), vec!["wasmtime"]);
        Ok(())
    }
}
