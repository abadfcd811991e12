use crate::config::AnalysisConfig;
use crate::model::SummaryOutput;
use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod chart;
pub mod console;
pub mod document;

/// Write the JSON summary of a scenario to `<out_dir>/<scenario>_summary.json`.
pub fn write_summary_output(
    config: &AnalysisConfig,
    output: &SummaryOutput,
) -> anyhow::Result<PathBuf> {
    config.ensure_out_dir()?;

    let path = config.output_path(&format!("{}_summary.json", output.scenario.replace('-', "_")));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create summary file {}", path.display()))?;
    serde_json::to_writer_pretty(file, output)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    log::debug!("Wrote summary output to {}", path.display());
    Ok(path)
}

/// Write a text report, replacing any previous version.
pub fn write_text(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report {}", path.display()))
}

/// Render a chart to `path`.
///
/// Rendering failures are logged rather than returned, the remaining outputs of the scenario are
/// still produced.
pub fn save_chart<F>(path: &Path, render: F)
where
    F: FnOnce(&Path) -> anyhow::Result<()>,
{
    match render(path) {
        Ok(()) => println!("Saved chart to {}", path.display()),
        Err(e) => log::warn!("Failed to render chart {}: {e:?}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_output_is_written_pretty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AnalysisConfig::new(dir.path());
        let output = SummaryOutput::new(
            "cpu-hash",
            "abc".to_string(),
            serde_json::json!({"native": 1.0}),
        )?;

        let path = write_summary_output(&config, &output)?;

        assert_eq!(
            path,
            dir.path().join("results/processed/cpu_hash_summary.json")
        );
        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("\n  \"scenario\": \"cpu-hash\""));
        let read_back: SummaryOutput = serde_json::from_str(&content)?;
        assert_eq!(read_back, output);
        Ok(())
    }
}
