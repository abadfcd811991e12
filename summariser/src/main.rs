use anyhow::anyhow;
use bench_summariser::config::AnalysisConfig;
use bench_summariser::{execute_report_for_scenario, Scenario, ScenarioOutcome};
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;

/// Analyse benchmark logs and write charts, reports and JSON summaries
#[derive(Parser, Debug)]
#[command(version, about)]
struct CliArgs {
    /// The analyses to run, all of them when none are given
    #[arg(value_enum)]
    scenarios: Vec<Scenario>,

    /// Benchmark root directory, containing `results/raw`
    #[arg(long, env = "BENCH_ROOT", default_value = ".")]
    root: PathBuf,

    /// Where to write the outputs, defaults to `<root>/results/processed`
    #[arg(long, env = "BENCH_OUT_DIR")]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let ignore_errors = std::env::var("IGNORE_SUMMARY_ERRORS").is_ok();

    let mut config = AnalysisConfig::new(&args.root);
    if let Some(out_dir) = args.out_dir {
        config = config.with_out_dir(out_dir);
    }
    log::info!("Reading results under {}", config.root_dir().display());
    log::debug!("Using {config:?}");

    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios
    };

    let total_scenarios = scenarios.len();
    let mut errors = vec![];
    let mut completed = 0;

    for scenario in scenarios {
        match execute_report_for_scenario(&config, scenario) {
            Ok(ScenarioOutcome::Completed(_)) => completed += 1,
            Ok(ScenarioOutcome::NoData) => {}
            Err(e) => {
                log::error!("{scenario} failed: {e:?}");
                errors.push(e);
            }
        }
    }

    log::info!(
        "{completed} of {total_scenarios} scenarios produced output in {}",
        config.out_dir().display()
    );

    // If any of the scenarios failed and errors should not explicitly be ignored, return an error
    if !errors.is_empty() {
        let error_message = format!(
            "{} out of {} scenarios failed:\n{:#?}",
            errors.len(),
            total_scenarios,
            errors
        );

        if ignore_errors {
            log::warn!("{}", error_message);
        } else {
            return Err(anyhow!(error_message));
        }
    }

    Ok(())
}
