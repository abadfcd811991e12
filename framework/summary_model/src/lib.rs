use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// The experimental condition a sample was measured under, in addition to its runtime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The benchmark has no condition beyond the runtime
    Unconditioned,
    /// Number of concurrently running instances
    Concurrency(u32),
    /// The HTTP endpoint path that was requested
    Path(String),
    /// The cold start scenario
    Start(StartKind),
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Unconditioned => write!(f, "all"),
            Condition::Concurrency(conc) => write!(f, "conc={conc}"),
            Condition::Path(path) => write!(f, "path={path}"),
            Condition::Start(kind) => write!(f, "{kind}"),
        }
    }
}

/// Cold start scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartKind {
    /// Build from source (no cache) followed by a runtime start
    FullCold,
    /// Fresh process start from a pre-built artifact
    RuntimeCold,
}

impl StartKind {
    pub const ALL: [StartKind; 2] = [StartKind::FullCold, StartKind::RuntimeCold];

    /// The name used for this scenario in the measurement CSV
    pub fn as_str(&self) -> &'static str {
        match self {
            StartKind::FullCold => "full_cold",
            StartKind::RuntimeCold => "runtime_cold",
        }
    }

    /// Human readable name, `Full Cold` or `Runtime Cold`
    pub fn title(&self) -> &'static str {
        match self {
            StartKind::FullCold => "Full Cold",
            StartKind::RuntimeCold => "Runtime Cold",
        }
    }
}

impl Display for StartKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_cold" => Ok(StartKind::FullCold),
            "runtime_cold" => Ok(StartKind::RuntimeCold),
            other => Err(anyhow::anyhow!("Unknown cold start type: {other}")),
        }
    }
}

/// Everything parsed from one cold start run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The run identifier, taken from the log file name
    pub run_id: String,
    /// Time from launch to the first successful response
    pub cold_start_ms: f64,
    /// Latencies of the successful requests, in request order
    pub latencies_ms: Vec<f64>,
}

/// One row of the cold start comparison CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdStartEntry {
    pub run: i64,
    pub build_ms: f64,
    pub start_ms: f64,
    pub total_ms: f64,
}

/// The samples for one runtime under one condition, in parse order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub runtime: String,
    pub condition: Condition,
    pub values: Vec<f64>,
}

/// Samples keyed by runtime and condition.
///
/// Runtimes are kept in the order they were first seen, which is the order a scenario lists its
/// runtimes in. Samples within a series keep their parse order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleCollection {
    series: Vec<SampleSeries>,
}

impl SampleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for the given runtime and condition
    pub fn push_value(&mut self, runtime: &str, condition: Condition, value: f64) {
        self.series_mut(runtime, condition).values.push(value);
    }

    /// Add all values for the given runtime and condition
    pub fn extend<I>(&mut self, runtime: &str, condition: Condition, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        self.series_mut(runtime, condition).values.extend(values);
    }

    /// The samples for a runtime and condition, if any were recorded
    pub fn get(&self, runtime: &str, condition: &Condition) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.runtime == runtime && &s.condition == condition)
            .map(|s| s.values.as_slice())
            .filter(|values| !values.is_empty())
    }

    /// Runtimes that have at least one sample, in insertion order
    pub fn runtimes(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter(|s| !s.values.is_empty())
            .map(|s| s.runtime.as_str())
            .unique()
            .collect()
    }

    /// The sorted conditions that a runtime has samples for
    pub fn conditions(&self, runtime: &str) -> Vec<&Condition> {
        self.series
            .iter()
            .filter(|s| s.runtime == runtime && !s.values.is_empty())
            .map(|s| &s.condition)
            .sorted()
            .collect()
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.series.iter().map(|s| s.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn series_mut(&mut self, runtime: &str, condition: Condition) -> &mut SampleSeries {
        let position = self
            .series
            .iter()
            .position(|s| s.runtime == runtime && s.condition == condition);

        match position {
            Some(index) => &mut self.series[index],
            None => {
                self.series.push(SampleSeries {
                    runtime: runtime.to_string(),
                    condition,
                    values: Vec::new(),
                });
                let last = self.series.len() - 1;
                &mut self.series[last]
            }
        }
    }
}

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Durations, latencies and memory: the smaller mean wins
    LowerIsBetter,
    /// Throughput: the larger mean wins
    HigherIsBetter,
}

/// The unit a metric is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Milliseconds,
    RequestsPerSecond,
    IterationsPerSecond,
    Kilobytes,
    Megabytes,
}

impl MetricUnit {
    pub fn label(&self) -> &'static str {
        match self {
            MetricUnit::Milliseconds => "ms",
            MetricUnit::RequestsPerSecond => "req/s",
            MetricUnit::IterationsPerSecond => "iter/s",
            MetricUnit::Kilobytes => "KB",
            MetricUnit::Megabytes => "MB",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            MetricUnit::RequestsPerSecond | MetricUnit::IterationsPerSecond => {
                Direction::HigherIsBetter
            }
            MetricUnit::Milliseconds | MetricUnit::Kilobytes | MetricUnit::Megabytes => {
                Direction::LowerIsBetter
            }
        }
    }
}

impl Display for MetricUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fingerprint of the input files that a summary was computed from.
///
/// Every file is fed in with its name and full content, in the order it was read. Two summaries
/// with the same fingerprint were computed from identical input data.
///
/// The fingerprint is computed using [sha3::Sha3_256].
pub struct InputFingerprint {
    hasher: sha3::Sha3_256,
    files: usize,
}

impl Default for InputFingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFingerprint {
    pub fn new() -> Self {
        Self {
            hasher: sha3::Sha3_256::new(),
            files: 0,
        }
    }

    /// Add a file that was read as input
    pub fn update(&mut self, path: &Path, content: &[u8]) {
        if let Some(name) = path.file_name() {
            Digest::update(&mut self.hasher, name.as_encoded_bytes());
        }
        Digest::update(&mut self.hasher, (content.len() as u64).to_le_bytes());
        Digest::update(&mut self.hasher, content);
        self.files += 1;
    }

    /// The number of files added so far
    pub fn files(&self) -> usize {
        self.files
    }

    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn runtimes_keep_insertion_order() {
        let mut collection = SampleCollection::new();
        collection.push_value("wasmtime", Condition::Unconditioned, 3.0);
        collection.push_value("native", Condition::Unconditioned, 1.0);
        collection.push_value("wasmtime", Condition::Unconditioned, 4.0);
        collection.push_value("docker", Condition::Unconditioned, 2.0);

        assert_eq!(collection.runtimes(), vec!["wasmtime", "native", "docker"]);
        assert_eq!(
            collection.get("wasmtime", &Condition::Unconditioned),
            Some([3.0, 4.0].as_slice())
        );
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn conditions_are_sorted() {
        let mut collection = SampleCollection::new();
        collection.push_value("native", Condition::Concurrency(8), 1.0);
        collection.push_value("native", Condition::Concurrency(1), 1.0);
        collection.push_value("native", Condition::Concurrency(4), 1.0);

        assert_eq!(
            collection.conditions("native"),
            vec![
                &Condition::Concurrency(1),
                &Condition::Concurrency(4),
                &Condition::Concurrency(8)
            ]
        );
    }

    #[test]
    fn empty_series_are_not_reported() {
        let mut collection = SampleCollection::new();
        collection.extend("native", Condition::Unconditioned, Vec::new());

        assert!(collection.is_empty());
        assert!(collection.runtimes().is_empty());
        assert_eq!(collection.get("native", &Condition::Unconditioned), None);
    }

    #[test]
    fn start_kind_round_trips_through_csv_name() -> anyhow::Result<()> {
        for kind in StartKind::ALL {
            assert_eq!(kind, kind.as_str().parse::<StartKind>()?);
        }
        assert!("warm".parse::<StartKind>().is_err());
        Ok(())
    }

    #[test]
    fn fingerprint_depends_on_content() {
        let path = PathBuf::from("2024-01-01T00-00-00Z_run.log");

        let mut a = InputFingerprint::new();
        a.update(&path, b"outer_ms=1.0");
        let mut b = InputFingerprint::new();
        b.update(&path, b"outer_ms=1.0");
        let mut c = InputFingerprint::new();
        c.update(&path, b"outer_ms=2.0");

        assert_eq!(a.files(), 1);
        let a = a.finish();
        assert_eq!(a, b.finish());
        assert_ne!(a, c.finish());
    }

    #[test]
    fn throughput_is_higher_is_better() {
        assert_eq!(
            MetricUnit::RequestsPerSecond.direction(),
            Direction::HigherIsBetter
        );
        assert_eq!(MetricUnit::Megabytes.direction(), Direction::LowerIsBetter);
    }
}
