use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No samples to compute statistics from")]
    NoSamples,
    #[error("Malformed value for `{field}` in {path}:{line}: {value:?}")]
    MalformedValue {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("No {benchmark} scaling data found")]
    NoScalingData { benchmark: &'static str },
}
