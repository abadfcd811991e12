use serde::{Deserialize, Serialize};

/// The JSON summary written for every completed scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryOutput {
    pub scenario: String,
    /// Fingerprint of every input file the scenario read
    pub input_fingerprint: String,
    pub data: serde_json::Value,
}

impl SummaryOutput {
    pub fn new<V>(
        scenario: impl Into<String>,
        input_fingerprint: String,
        data: V,
    ) -> anyhow::Result<Self>
    where
        V: serde::Serialize,
    {
        Ok(Self {
            scenario: scenario.into(),
            input_fingerprint,
            data: serde_json::to_value(data)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeStats {
    pub runtime: String,
    pub stats: StandardStats,
}

/// Five number summary plus mean, as drawn by a box plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub mean: f64,
    pub outliers: Vec<f64>,
}

/// The result of comparing the means of two runtimes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    pub winner: String,
    pub loser: String,
    /// How many times better the winner is, always at least 1 for positive means
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingEfficiency {
    pub concurrency: u32,
    pub actual_speedup: f64,
    pub ideal_speedup: f64,
    pub efficiency_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignificanceTest {
    pub first_mean: f64,
    pub second_mean: f64,
    /// Relative difference of the second mean to the first
    pub diff_pct: f64,
    pub u_statistic: f64,
    pub p_value: f64,
    pub marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PairOutcome {
    Tested(SignificanceTest),
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairComparison {
    pub first: String,
    pub second: String,
    pub outcome: PairOutcome,
}

/// Statistics of one runtime at one concurrency level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcurrencyStats {
    pub concurrency: u32,
    pub stats: StandardStats,
}
