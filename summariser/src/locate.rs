use anyhow::Context;
use bench_summary_model::InputFingerprint;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name suffix of the per-run logs written by the measurement scripts
pub const RUN_LOG_SUFFIX: &str = "_run.log";

/// Find the run logs directly inside `dir`, sorted by file name.
///
/// A missing or unreadable directory is not an error, it just has no run logs. The caller decides
/// whether that deserves a warning.
pub fn find_run_logs(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::debug!("No log directory at {}", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(RUN_LOG_SUFFIX))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Find a specific file inside `dir`, if it exists.
pub fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let path = dir.join(file_name);
    if path.is_file() {
        Some(path)
    } else {
        log::debug!("No file at {}", path.display());
        None
    }
}

/// Reads input files and keeps an [InputFingerprint] of everything it has read.
#[derive(Default)]
pub struct LogReader {
    fingerprint: InputFingerprint,
}

impl LogReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a whole file as text.
    pub fn read(&mut self, path: &Path) -> anyhow::Result<String> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        self.fingerprint.update(path, &bytes);
        log::trace!("Read {} bytes from {}", bytes.len(), path.display());

        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
    }

    /// Number of files read so far
    pub fn files_read(&self) -> usize {
        self.fingerprint.files()
    }

    /// Finish reading and return the fingerprint of all the inputs.
    pub fn finish(self) -> String {
        self.fingerprint.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sorted_run_logs_only() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("2024-01-02T00-00-00Z_run.log"), "")?;
        std::fs::write(dir.path().join("2024-01-01T00-00-00Z_run.log"), "")?;
        std::fs::write(dir.path().join("2024-01-01T00-00-00Z_build.log"), "")?;
        std::fs::create_dir(dir.path().join("nested_run.log"))?;

        let logs = find_run_logs(dir.path());
        let names = logs
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec!["2024-01-01T00-00-00Z_run.log", "2024-01-02T00-00-00Z_run.log"]
        );
        Ok(())
    }

    #[test]
    fn missing_directory_has_no_logs() {
        let logs = find_run_logs(Path::new("/definitely/not/a/results/dir"));
        assert!(logs.is_empty());
    }

    #[test]
    fn reader_fingerprints_what_it_reads() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("a_run.log");
        std::fs::write(&path, "outer_ms=1.0\n")?;

        let mut reader = LogReader::new();
        assert_eq!(reader.read(&path)?, "outer_ms=1.0\n");
        assert_eq!(reader.files_read(), 1);
        assert_eq!(reader.finish().len(), 64);

        assert!(find_file(dir.path(), "a_run.log").is_some());
        assert!(find_file(dir.path(), "cold_start_data.csv").is_none());
        Ok(())
    }
}
