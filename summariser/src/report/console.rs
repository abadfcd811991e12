use crate::model::{ConfidenceInterval, PairComparison, PairOutcome, RuntimeStats};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const BANNER_WIDTH: usize = 80;

#[derive(Tabled)]
pub struct StatsRow {
    #[tabled(rename = "Runtime")]
    pub runtime: String,
    #[tabled(rename = "n")]
    pub count: usize,
    #[tabled(rename = "Mean", display = "float2")]
    pub mean: f64,
    #[tabled(rename = "Median", display = "float2")]
    pub median: f64,
    #[tabled(rename = "Std Dev", display = "float2")]
    pub std: f64,
    #[tabled(rename = "Min", display = "float2")]
    pub min: f64,
    #[tabled(rename = "Max", display = "float2")]
    pub max: f64,
    #[tabled(rename = "P95", display = "float2")]
    pub p95: f64,
    #[tabled(rename = "P99", display = "float2")]
    pub p99: f64,
    #[tabled(rename = "95% CI", display = "interval")]
    pub confidence_interval: Option<ConfidenceInterval>,
}

impl From<&RuntimeStats> for StatsRow {
    fn from(value: &RuntimeStats) -> Self {
        Self {
            runtime: value.runtime.clone(),
            count: value.stats.count,
            mean: value.stats.mean,
            median: value.stats.median,
            std: value.stats.std,
            min: value.stats.min,
            max: value.stats.max,
            p95: value.stats.p95,
            p99: value.stats.p99,
            confidence_interval: value.stats.confidence_interval,
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

fn interval(ci: &Option<ConfidenceInterval>) -> String {
    match ci {
        Some(ci) => format!("[{:.2}, {:.2}]", ci.lower, ci.upper),
        None => "-".to_string(),
    }
}

pub fn print_banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{rule}\n{title}\n{rule}");
}

/// Print per-runtime statistics as a table, with the unit in the heading.
pub fn print_stats_table(heading: &str, unit: &str, stats: &[RuntimeStats]) {
    if stats.is_empty() {
        return;
    }

    println!("\n{heading} ({unit})");
    let mut table = Table::new(stats.iter().map(StatsRow::from));
    table.with(Style::modern());
    println!("{table}");
}

pub fn print_significance(comparisons: &[PairComparison]) {
    if comparisons.is_empty() {
        return;
    }

    println!("\nStatistical significance (Mann-Whitney U, two-sided)");
    for comparison in comparisons {
        match &comparison.outcome {
            PairOutcome::Tested(test) => println!(
                "  {} vs {}: mean {:.2} vs {:.2} ({:+.1}%), U={:.1}, p={:.4} {}",
                comparison.first,
                comparison.second,
                test.first_mean,
                test.second_mean,
                test.diff_pct,
                test.u_statistic,
                test.p_value,
                test.marker
            ),
            PairOutcome::Skipped { reason } => println!(
                "  {} vs {}: skipped, {reason}",
                comparison.first, comparison.second
            ),
        }
    }
    println!("  Legend: *** p<0.001, ** p<0.01, * p<0.05, ns not significant");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StandardStats;

    #[test]
    fn rows_show_two_decimals() {
        let stats = RuntimeStats {
            runtime: "native".to_string(),
            stats: StandardStats {
                count: 3,
                mean: 20.0,
                median: 20.0,
                std: 10.0,
                min: 10.0,
                max: 30.0,
                p95: 30.0,
                p99: 30.0,
                confidence_interval: None,
            },
        };

        let mut table = Table::new([StatsRow::from(&stats)]);
        table.with(Style::modern());
        let rendered = table.to_string();

        assert!(rendered.contains("native"));
        assert!(rendered.contains("20.00"));
        assert!(rendered.contains("Std Dev"));
        assert!(rendered.contains(" - "));
    }
}
