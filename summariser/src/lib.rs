use crate::config::AnalysisConfig;
use crate::model::SummaryOutput;
use anyhow::Context;
use scenario::*;

pub mod analyze;
pub mod config;
pub mod error;
pub mod locate;
pub mod model;
pub mod parse;
pub mod report;
mod scenario;

/// The benchmark analyses, in the order they run by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Scenario {
    ColdStartComparison,
    CpuHash,
    CpuHashScaling,
    HttpHello,
    HttpHelloScaling,
    HttpHelloStateful,
    NativeHttpHello,
    WasmHello,
    Summary,
}

impl Scenario {
    pub const ALL: [Scenario; 9] = [
        Scenario::ColdStartComparison,
        Scenario::CpuHash,
        Scenario::CpuHashScaling,
        Scenario::HttpHello,
        Scenario::HttpHelloScaling,
        Scenario::HttpHelloStateful,
        Scenario::NativeHttpHello,
        Scenario::WasmHello,
        Scenario::Summary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ColdStartComparison => "cold-start-comparison",
            Scenario::CpuHash => "cpu-hash",
            Scenario::CpuHashScaling => "cpu-hash-scaling",
            Scenario::HttpHello => "http-hello",
            Scenario::HttpHelloScaling => "http-hello-scaling",
            Scenario::HttpHelloStateful => "http-hello-stateful",
            Scenario::NativeHttpHello => "native-http-hello",
            Scenario::WasmHello => "wasm-hello",
            Scenario::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What running a scenario produced
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOutcome {
    /// The scenario found data and wrote its reports
    Completed(SummaryOutput),
    /// There was nothing to analyse, guidance was printed and nothing was written
    NoData,
}

/// Run one scenario, writing its charts, reports and JSON summary under the configured output
/// directory.
pub fn execute_report_for_scenario(
    config: &AnalysisConfig,
    scenario: Scenario,
) -> anyhow::Result<ScenarioOutcome> {
    log::info!("Running {scenario} analysis");

    let outcome = match scenario {
        Scenario::ColdStartComparison => {
            summarize_cold_start_comparison(config).context("Cold start comparison summary")?
        }
        Scenario::CpuHash => summarize_cpu_hash(config).context("CPU hash summary")?,
        Scenario::CpuHashScaling => {
            summarize_cpu_hash_scaling(config).context("CPU hash scaling summary")?
        }
        Scenario::HttpHello => summarize_http_hello(config).context("HTTP hello summary")?,
        Scenario::HttpHelloScaling => {
            summarize_http_hello_scaling(config).context("HTTP hello scaling summary")?
        }
        Scenario::HttpHelloStateful => {
            summarize_http_hello_stateful(config).context("HTTP hello stateful summary")?
        }
        Scenario::NativeHttpHello => {
            summarize_native_http_hello(config).context("Native HTTP hello summary")?
        }
        Scenario::WasmHello => summarize_wasm_hello(config).context("Wasm hello summary")?,
        Scenario::Summary => summarize_benchmarks(config).context("Benchmark summary")?,
    };

    match &outcome {
        ScenarioOutcome::Completed(output) => {
            let path = report::write_summary_output(config, output)?;
            log::info!("Finished {scenario}, summary written to {}", path.display());
        }
        ScenarioOutcome::NoData => log::info!("No data for {scenario}, nothing written"),
    }

    Ok(outcome)
}
