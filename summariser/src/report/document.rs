use crate::analyze::{compare_means, overhead_pct, speedup};
use crate::model::RuntimeStats;
use bench_summary_model::{Direction, MetricUnit};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Runtime that the markdown speedups are relative to
pub const SPEEDUP_BASELINE: &str = "docker";
/// Runtime that the executive summary CPU overhead is relative to
pub const CPU_BASELINE: &str = "native";

const RULE_WIDTH: usize = 80;

/// The metrics collected into the cross-benchmark summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMetric {
    ColdStart,
    HttpLatency,
    HttpThroughput,
    MemoryUsage,
    CpuHash,
}

impl SummaryMetric {
    pub const ALL: [SummaryMetric; 5] = [
        SummaryMetric::ColdStart,
        SummaryMetric::HttpLatency,
        SummaryMetric::HttpThroughput,
        SummaryMetric::MemoryUsage,
        SummaryMetric::CpuHash,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SummaryMetric::ColdStart => "Cold Start",
            SummaryMetric::HttpLatency => "HTTP Latency (p50)",
            SummaryMetric::HttpThroughput => "HTTP Throughput",
            SummaryMetric::MemoryUsage => "Memory Usage",
            SummaryMetric::CpuHash => "CPU Hash Performance",
        }
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            SummaryMetric::ColdStart | SummaryMetric::HttpLatency | SummaryMetric::CpuHash => {
                MetricUnit::Milliseconds
            }
            SummaryMetric::HttpThroughput => MetricUnit::RequestsPerSecond,
            SummaryMetric::MemoryUsage => MetricUnit::Megabytes,
        }
    }
}

/// Statistics of every runtime with data for one summary metric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSection {
    pub metric: SummaryMetric,
    pub stats: Vec<RuntimeStats>,
}

impl BenchmarkSection {
    fn runtime(&self, runtime: &str) -> Option<&RuntimeStats> {
        self.stats.iter().find(|s| s.runtime == runtime)
    }
}

fn section(sections: &[BenchmarkSection], metric: SummaryMetric) -> Option<&BenchmarkSection> {
    sections
        .iter()
        .find(|s| s.metric == metric && !s.stats.is_empty())
}

pub fn markdown_summary(sections: &[BenchmarkSection]) -> String {
    let mut out = String::new();
    out.push_str("# Benchmark Summary\n\n## Performance Comparison\n\n");

    for section in sections.iter().filter(|s| !s.stats.is_empty()) {
        let unit = section.metric.unit();

        let _ = writeln!(out, "### {}\n", section.metric.title());
        out.push_str("| Runtime | Mean | Median | Std Dev | Min | Max | P95 | P99 | Samples |\n");
        out.push_str("|---------|------|--------|---------|-----|-----|-----|-----|---------|\n");
        for rt in &section.stats {
            let s = &rt.stats;
            let _ = writeln!(
                out,
                "| {} | {:.2} {unit} | {:.2} {unit} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {} |",
                rt.runtime, s.mean, s.median, s.std, s.min, s.max, s.p95, s.p99, s.count
            );
        }

        if let Some(baseline) = section.runtime(SPEEDUP_BASELINE) {
            out.push_str("\n**Speedup vs Docker:**\n\n");
            for rt in section
                .stats
                .iter()
                .filter(|rt| rt.runtime != SPEEDUP_BASELINE)
            {
                let _ = writeln!(
                    out,
                    "- {}: {:.2}x",
                    rt.runtime,
                    speedup(baseline.stats.mean, rt.stats.mean, unit.direction())
                );
            }
        }

        out.push('\n');
    }

    out
}

/// One data row of a rendered markdown table
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownRow {
    pub runtime: String,
    /// The leading number of every cell after the runtime
    pub values: Vec<f64>,
}

/// Read the data rows back out of markdown tables, skipping headers and separators.
pub fn parse_markdown_table(markdown: &str) -> Vec<MarkdownRow> {
    markdown
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|') && !line.starts_with("|-"))
        .filter_map(|line| {
            let mut cells = line.trim_matches('|').split('|').map(str::trim);
            let runtime = cells.next()?.to_string();
            let values = cells
                .map(|cell| cell.split_whitespace().next()?.parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            Some(MarkdownRow { runtime, values })
        })
        .collect()
}

pub fn latex_summary(sections: &[BenchmarkSection]) -> String {
    let mut out = String::new();
    out.push_str("\\begin{table}[h]\n");
    out.push_str("\\centering\n");
    out.push_str("\\caption{Benchmark Results Summary}\n");
    out.push_str("\\label{tab:benchmark_summary}\n");

    for section in sections.iter().filter(|s| !s.stats.is_empty()) {
        out.push_str("\\begin{tabular}{lrrrr}\n");
        out.push_str("\\hline\n");
        let _ = writeln!(
            out,
            "\\multicolumn{{5}}{{c}}{{\\textbf{{{}}}}} \\\\",
            section.metric.title()
        );
        out.push_str("\\hline\n");
        out.push_str("Runtime & Mean & Median & Std Dev & Min \\\\\n");
        out.push_str("\\hline\n");
        for rt in &section.stats {
            let s = &rt.stats;
            let _ = writeln!(
                out,
                "{} & {:.2} & {:.2} & {:.2} & {:.2} \\\\",
                rt.runtime.replace('_', "\\_"),
                s.mean,
                s.median,
                s.std,
                s.min
            );
        }
        out.push_str("\\hline\n");
        out.push_str("\\end{tabular}\n");
        out.push_str("\\vspace{1em}\n\n");
    }

    out.push_str("\\end{table}\n");
    out
}

pub fn executive_summary(sections: &[BenchmarkSection]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\nWASM BENCHMARK EXECUTIVE SUMMARY\n{rule}\n");
    let _ = writeln!(out, "KEY FINDINGS:\n{}", "-".repeat(RULE_WIDTH));

    if let Some(cold_start) = section(sections, SummaryMetric::ColdStart) {
        out.push_str("\n1. Cold Start Performance:\n");
        let fastest = cold_start
            .stats
            .iter()
            .skip(1)
            .fold(&cold_start.stats[0], |best, rt| {
                let comparison = compare_means(
                    (best.runtime.as_str(), best.stats.mean),
                    (rt.runtime.as_str(), rt.stats.mean),
                    Direction::LowerIsBetter,
                );
                if comparison.winner == best.runtime {
                    best
                } else {
                    rt
                }
            });

        let _ = writeln!(
            out,
            "   - {:<10}: {:6.2} ms (fastest)",
            display_name(&fastest.runtime),
            fastest.stats.mean
        );
        for rt in cold_start
            .stats
            .iter()
            .filter(|rt| rt.runtime != fastest.runtime)
        {
            let _ = writeln!(
                out,
                "   - {:<10}: {:6.2} ms ({:.2}x slower)",
                display_name(&rt.runtime),
                rt.stats.mean,
                rt.stats.mean / fastest.stats.mean
            );
        }
    }

    if let Some(throughput) = section(sections, SummaryMetric::HttpThroughput) {
        out.push_str("\n2. HTTP Throughput:\n");
        for rt in &throughput.stats {
            let _ = writeln!(out, "   - {:<10}: {:8.1} req/s", rt.runtime, rt.stats.mean);
        }
    }

    if let Some(memory) = section(sections, SummaryMetric::MemoryUsage) {
        out.push_str("\n3. Memory Usage:\n");
        for rt in &memory.stats {
            let _ = writeln!(out, "   - {:<10}: {:6.1} MB", rt.runtime, rt.stats.mean);
        }
    }

    if let Some(cpu) = section(sections, SummaryMetric::CpuHash) {
        if let Some(native) = cpu.runtime(CPU_BASELINE) {
            out.push_str("\n4. CPU-Bound Performance (relative to native):\n");
            for rt in cpu.stats.iter().filter(|rt| rt.runtime != CPU_BASELINE) {
                let _ = writeln!(
                    out,
                    "   - {:<10}: {:+5.1}% overhead",
                    rt.runtime,
                    overhead_pct(native.stats.mean, rt.stats.mean)
                );
            }
        }
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

/// `wasmtime` -> `Wasmtime`
fn display_name(runtime: &str) -> String {
    let mut chars = runtime.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::standard_stats;
    use pretty_assertions::assert_eq;

    fn runtime_stats(runtime: &str, values: &[f64]) -> anyhow::Result<RuntimeStats> {
        Ok(RuntimeStats {
            runtime: runtime.to_string(),
            stats: standard_stats(values)?,
        })
    }

    fn sections() -> anyhow::Result<Vec<BenchmarkSection>> {
        Ok(vec![
            BenchmarkSection {
                metric: SummaryMetric::ColdStart,
                stats: vec![
                    runtime_stats("native", &[10.0, 12.0, 14.0])?,
                    runtime_stats("docker", &[300.0, 320.0, 340.0])?,
                    runtime_stats("wasmtime", &[24.0, 24.0])?,
                ],
            },
            BenchmarkSection {
                metric: SummaryMetric::HttpThroughput,
                stats: vec![
                    runtime_stats("native", &[1000.0])?,
                    runtime_stats("docker", &[500.0])?,
                ],
            },
            BenchmarkSection {
                metric: SummaryMetric::CpuHash,
                stats: vec![
                    runtime_stats("native", &[100.0])?,
                    runtime_stats("wasmedge", &[150.0])?,
                ],
            },
        ])
    }

    #[test]
    fn markdown_has_a_row_per_runtime() -> anyhow::Result<()> {
        let markdown = markdown_summary(&sections()?);

        assert!(markdown.contains("### Cold Start"));
        assert!(markdown.contains("| native | 12.00 ms | 12.00 ms | 2.00 | 10.00 | 14.00 |"));
        assert!(markdown.contains("- native: 26.67x"));
        assert!(markdown.contains("- native: 2.00x"));
        assert!(!markdown.contains("### Memory Usage"));
        Ok(())
    }

    #[test]
    fn markdown_rows_parse_back() -> anyhow::Result<()> {
        let markdown = markdown_summary(&sections()?);
        let rows = parse_markdown_table(&markdown);

        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].runtime, "native");
        assert_eq!(
            rows[0].values,
            vec![12.0, 12.0, 2.0, 10.0, 14.0, 14.0, 14.0, 3.0]
        );
        Ok(())
    }

    #[test]
    fn latex_has_one_tabular_per_benchmark() -> anyhow::Result<()> {
        let latex = latex_summary(&sections()?);

        assert_eq!(latex.matches("\\begin{tabular}").count(), 3);
        assert!(latex.contains("\\multicolumn{5}{c}{\\textbf{Cold Start}} \\\\"));
        assert!(latex.contains("native & 12.00 & 12.00 & 2.00 & 10.00 \\\\"));
        assert!(latex.trim_end().ends_with("\\end{table}"));
        Ok(())
    }

    #[test]
    fn executive_summary_names_the_fastest() -> anyhow::Result<()> {
        let summary = executive_summary(&sections()?);

        assert!(summary.contains("   - Native    :  12.00 ms (fastest)"));
        assert!(summary.contains("   - Wasmtime  :  24.00 ms (2.00x slower)"));
        assert!(summary.contains("   - native    :   1000.0 req/s"));
        assert!(summary.contains("   - wasmedge  : +50.0% overhead"));
        assert!(!summary.contains("Memory Usage"));
        Ok(())
    }
}
