use anyhow::Context;
use std::path::{Path, PathBuf};

/// Directory, relative to the root, that the measurement tooling writes raw logs to
const RAW_DIR: &str = "results/raw";
/// Directory, relative to the root, that charts and reports are written to
const PROCESSED_DIR: &str = "results/processed";

/// Where to find the raw benchmark logs and where to write the reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    root_dir: PathBuf,
    out_dir: PathBuf,
}

impl AnalysisConfig {
    /// Create a config rooted at `root_dir`, writing to `<root_dir>/results/processed`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let out_dir = root_dir.join(PROCESSED_DIR);
        Self { root_dir, out_dir }
    }

    /// Override the output directory.
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root_dir.join(RAW_DIR)
    }

    /// The directory holding the logs of one benchmark for one runtime,
    /// `<root>/results/raw/<runtime_dir>/<benchmark>`.
    pub fn benchmark_dir(&self, runtime_dir: &str, benchmark: &str) -> PathBuf {
        self.raw_dir().join(runtime_dir).join(benchmark)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_out_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.out_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.out_dir.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let config = AnalysisConfig::new("/bench");

        assert_eq!(
            config.benchmark_dir("wasm", "cpu-hash"),
            PathBuf::from("/bench/results/raw/wasm/cpu-hash")
        );
        assert_eq!(
            config.output_path("benchmark_summary.md"),
            PathBuf::from("/bench/results/processed/benchmark_summary.md")
        );
    }

    #[test]
    fn out_dir_override() {
        let config = AnalysisConfig::new("/bench").with_out_dir("/tmp/out");

        assert_eq!(config.out_dir(), Path::new("/tmp/out"));
        assert_eq!(config.root_dir(), Path::new("/bench"));
    }
}
