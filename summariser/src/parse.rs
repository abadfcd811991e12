use crate::error::AnalysisError;
use bench_summary_model::RunRecord;
use regex::{Captures, Regex};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// A `key=value` field that is extracted on its own from log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ColdStartMs,
    LatencyMs,
    OuterMs,
    ElapsedMs,
    ThroughputRps,
    RssKb,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::ColdStartMs => "cold_start_ms",
            Field::LatencyMs => "latency_ms",
            Field::OuterMs => "outer_ms",
            Field::ElapsedMs => "elapsed_ms",
            Field::ThroughputRps => "throughput_rps",
            Field::RssKb => "rss_kb",
        }
    }

    fn regex(&self) -> &'static Regex {
        static COLD_START_MS: OnceLock<Regex> = OnceLock::new();
        static LATENCY_MS: OnceLock<Regex> = OnceLock::new();
        static OUTER_MS: OnceLock<Regex> = OnceLock::new();
        static ELAPSED_MS: OnceLock<Regex> = OnceLock::new();
        static THROUGHPUT_RPS: OnceLock<Regex> = OnceLock::new();
        static RSS_KB: OnceLock<Regex> = OnceLock::new();

        let cell = match self {
            Field::ColdStartMs => &COLD_START_MS,
            Field::LatencyMs => &LATENCY_MS,
            Field::OuterMs => &OUTER_MS,
            Field::ElapsedMs => &ELAPSED_MS,
            Field::ThroughputRps => &THROUGHPUT_RPS,
            Field::RssKb => &RSS_KB,
        };
        cell.get_or_init(|| compile(&format!("{}=([0-9.]+)", self.key())))
    }
}

/// One summary line of the http scaling benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct HttpScalingLine {
    pub run: u32,
    pub concurrency: u32,
    pub total_requests: u64,
    pub elapsed_ms: f64,
    pub throughput_rps: f64,
    pub total_rss_kb: u64,
    pub avg_rss_kb: u64,
}

/// Endpoint path assumed for latency lines that do not name one
pub const DEFAULT_PATH: &str = "/";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("log line regex")
}

fn run_log_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}Z)_run\.log$"))
}

fn cold_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"cold_start_ms=(\d+\.?\d*)"))
}

fn request_latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r"req=(\d+)\s+http_code=(\d{3})\s+latency_ns=(\d+)\s+latency_ms=(\d+\.?\d*)")
    })
}

fn path_latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"req=\d+(?:\s+path=([^\s]+))?\s+.*?latency_ms=([0-9.]+)"))
}

fn cpu_scaling_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"conc=(\d+).*throughput_iter_s=([0-9.]+)"))
}

fn http_scaling_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(
            r"run=(\d+)\s+conc=(\d+)\s+total_requests=(\d+)\s+elapsed_ms=([0-9.]+)\s+throughput_rps=([0-9.]+).*total_rss_kb=(\d+).*avg_rss_kb=(\d+)",
        )
    })
}

/// Extract every value of `field` from the log content, in line order.
///
/// Only the first occurrence on each line counts. Lines without the field are ignored.
pub fn capture_values(path: &Path, content: &str, field: Field) -> anyhow::Result<Vec<f64>> {
    let regex = field.regex();
    let mut values = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(captures) = regex.captures(line) {
            values.push(parse_group(path, index + 1, &captures, 1, field.key())?);
        }
    }

    if values.is_empty() {
        log::debug!("No `{}` lines in {}", field.key(), path.display());
    }

    Ok(values)
}

/// Parse a cold start run log into a [RunRecord].
///
/// Returns [None], with a warning, when the file name carries no run id or the log has no cold
/// start line or no successful request.
pub fn parse_run_record(path: &Path, content: &str) -> anyhow::Result<Option<RunRecord>> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let Some(run_id) = run_log_name_regex()
        .captures(file_name)
        .map(|captures| captures[1].to_string())
    else {
        log::debug!("Not a timestamped run log: {}", path.display());
        return Ok(None);
    };

    let mut cold_start_ms = None;
    let mut latencies_ms = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        let line_no = index + 1;

        if let Some(captures) = cold_start_regex().captures(line) {
            cold_start_ms = Some(parse_group(path, line_no, &captures, 1, "cold_start_ms")?);
        }

        if let Some(captures) = request_latency_regex().captures(line) {
            let http_code: u16 = parse_group(path, line_no, &captures, 2, "http_code")?;
            let latency_ms: f64 = parse_group(path, line_no, &captures, 4, "latency_ms")?;
            if http_code == 200 {
                latencies_ms.push(latency_ms);
            }
        }
    }

    let Some(cold_start_ms) = cold_start_ms else {
        log::warn!("No cold_start_ms found in {}", path.display());
        return Ok(None);
    };

    if latencies_ms.is_empty() {
        log::warn!("No latency lines found in {}", path.display());
        return Ok(None);
    }

    Ok(Some(RunRecord {
        run_id,
        cold_start_ms,
        latencies_ms,
    }))
}

/// Extract `(path, latency_ms)` pairs, defaulting the path to [DEFAULT_PATH].
pub fn parse_path_latencies(path: &Path, content: &str) -> anyhow::Result<Vec<(String, f64)>> {
    let mut latencies = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(captures) = path_latency_regex().captures(line) {
            let endpoint = captures
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or(DEFAULT_PATH)
                .to_string();
            let latency_ms = parse_group(path, index + 1, &captures, 2, "latency_ms")?;
            latencies.push((endpoint, latency_ms));
        }
    }

    Ok(latencies)
}

/// Extract `(concurrency, throughput_iter_s)` pairs from a cpu scaling log.
pub fn parse_cpu_scaling(path: &Path, content: &str) -> anyhow::Result<Vec<(u32, f64)>> {
    let mut samples = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(captures) = cpu_scaling_regex().captures(line) {
            let line_no = index + 1;
            samples.push((
                parse_group(path, line_no, &captures, 1, "conc")?,
                parse_group(path, line_no, &captures, 2, "throughput_iter_s")?,
            ));
        }
    }

    Ok(samples)
}

/// Extract the per-run summary lines from an http scaling log.
pub fn parse_http_scaling(path: &Path, content: &str) -> anyhow::Result<Vec<HttpScalingLine>> {
    let mut lines = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(captures) = http_scaling_regex().captures(line) {
            let line_no = index + 1;
            lines.push(HttpScalingLine {
                run: parse_group(path, line_no, &captures, 1, "run")?,
                concurrency: parse_group(path, line_no, &captures, 2, "conc")?,
                total_requests: parse_group(path, line_no, &captures, 3, "total_requests")?,
                elapsed_ms: parse_group(path, line_no, &captures, 4, "elapsed_ms")?,
                throughput_rps: parse_group(path, line_no, &captures, 5, "throughput_rps")?,
                total_rss_kb: parse_group(path, line_no, &captures, 6, "total_rss_kb")?,
                avg_rss_kb: parse_group(path, line_no, &captures, 7, "avg_rss_kb")?,
            });
        }
    }

    Ok(lines)
}

fn parse_group<T: FromStr>(
    path: &Path,
    line: usize,
    captures: &Captures<'_>,
    group: usize,
    field: &'static str,
) -> anyhow::Result<T> {
    let raw = captures.get(group).map(|m| m.as_str()).unwrap_or_default();
    raw.parse::<T>().map_err(|_| {
        AnalysisError::MalformedValue {
            path: path.to_path_buf(),
            line,
            field,
            value: raw.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn log_path() -> PathBuf {
        PathBuf::from("results/raw/native/http-hello/2024-05-01T10-00-00Z_run.log")
    }

    #[test]
    fn captures_first_value_per_line() -> anyhow::Result<()> {
        let content = "start\nouter_ms=10.0\niteration outer_ms=20.5 outer_ms=99\nnothing here\nouter_ms=30\n";
        let values = capture_values(&log_path(), content, Field::OuterMs)?;

        assert_eq!(values, vec![10.0, 20.5, 30.0]);
        Ok(())
    }

    #[test]
    fn malformed_value_fails() {
        let err = capture_values(&log_path(), "outer_ms=1.2.3\n", Field::OuterMs).unwrap_err();

        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::MalformedValue { line, field, .. }) => {
                assert_eq!(*line, 1);
                assert_eq!(*field, "outer_ms");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rss_field_matches_inside_longer_keys() -> anyhow::Result<()> {
        let values = capture_values(
            &log_path(),
            "total_rss_kb=2048 avg_rss_kb=1024\n",
            Field::RssKb,
        )?;

        assert_eq!(values, vec![2048.0]);
        Ok(())
    }

    #[test]
    fn run_record_keeps_successful_requests() -> anyhow::Result<()> {
        let content = "\
[http-hello] listening
cold_start_ms=12.5
req=1 http_code=200 latency_ns=1500000 latency_ms=1.5
req=2 http_code=500 latency_ns=9000000 latency_ms=9.0
req=3 http_code=200 latency_ns=2500000 latency_ms=2.5
";
        let record = parse_run_record(&log_path(), content)?.expect("run record");

        assert_eq!(record.run_id, "2024-05-01T10-00-00Z");
        assert_eq!(record.cold_start_ms, 12.5);
        assert_eq!(record.latencies_ms, vec![1.5, 2.5]);
        Ok(())
    }

    #[test]
    fn run_record_requires_cold_start_and_latency() -> anyhow::Result<()> {
        let no_cold_start = "req=1 http_code=200 latency_ns=1 latency_ms=1.0\n";
        assert_eq!(parse_run_record(&log_path(), no_cold_start)?, None);

        let no_latency = "cold_start_ms=10\n";
        assert_eq!(parse_run_record(&log_path(), no_latency)?, None);

        let untimestamped = PathBuf::from("latest_run.log");
        let complete = "cold_start_ms=10\nreq=1 http_code=200 latency_ns=1 latency_ms=1.0\n";
        assert_eq!(parse_run_record(&untimestamped, complete)?, None);
        Ok(())
    }

    #[test]
    fn path_latencies_default_to_root() -> anyhow::Result<()> {
        let content = "\
req=1 http_code=200 latency_ns=1000000 latency_ms=1.0
req=2 path=/state http_code=200 latency_ns=3000000 latency_ms=3.0
";
        let latencies = parse_path_latencies(&log_path(), content)?;

        assert_eq!(
            latencies,
            vec![("/".to_string(), 1.0), ("/state".to_string(), 3.0)]
        );
        Ok(())
    }

    #[test]
    fn cpu_scaling_lines() -> anyhow::Result<()> {
        let content = "run=1 conc=4 instances_done=4 throughput_iter_s=812.5\n";
        assert_eq!(parse_cpu_scaling(&log_path(), content)?, vec![(4, 812.5)]);
        Ok(())
    }

    #[test]
    fn http_scaling_lines() -> anyhow::Result<()> {
        let content = "run=2 conc=8 total_requests=8000 elapsed_ms=1000.0 throughput_rps=8000.0 errors=0 total_rss_kb=81920 avg_rss_kb=10240\n\
instance=0 rps=1000.0 avg_lat_ns=1000 p50_lat_ns=900 p95_lat_ns=2000 p99_lat_ns=3000\n";
        let lines = parse_http_scaling(&log_path(), content)?;

        assert_eq!(
            lines,
            vec![HttpScalingLine {
                run: 2,
                concurrency: 8,
                total_requests: 8000,
                elapsed_ms: 1000.0,
                throughput_rps: 8000.0,
                total_rss_kb: 81920,
                avg_rss_kb: 10240,
            }]
        );
        Ok(())
    }
}
