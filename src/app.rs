use reqwest::Client;

use crate::{
    applier::{ApplyReport, apply_power_limits},
    arg_parser::ArgsOptions,
    command::CommandRunner,
    error_log::ErrorLog,
    errors::AppError,
    power_limits::{fetch_power_limits, load_power_limits_file},
    smi::list_gpus,
};

#[derive(Debug)]
pub struct RunSummary {
    pub rules: usize,
    pub gpus: usize,
    pub report: ApplyReport,
}

/// Load the rules, list the GPUs and apply the limits, one step after
/// the other. A failure to load the rules or to list the GPUs is recorded
/// in the error log and ends the run.
pub async fn run<R: CommandRunner>(
    args_options: &ArgsOptions,
    runner: &R,
    error_log: &ErrorLog,
) -> Result<RunSummary, AppError> {
    let summary = apply_configured_limits(args_options, runner, error_log).await;

    if let Err(err) = &summary {
        error_log.record("run", err);
    }

    summary
}

async fn apply_configured_limits<R: CommandRunner>(
    args_options: &ArgsOptions,
    runner: &R,
    error_log: &ErrorLog,
) -> Result<RunSummary, AppError> {
    let rules = match &args_options.config_file_path {
        Some(path) => load_power_limits_file(path)?,
        None => fetch_power_limits(&Client::new(), &args_options.url).await?,
    };

    println!("{} power limit settings found", rules.len());

    let gpus = list_gpus(runner, error_log).await?;

    println!("{} GPU(s) detected", gpus.len());

    let report = apply_power_limits(runner, &rules, &gpus, error_log).await;

    println!(
        "{} power limit change(s) applied, {} failure(s)",
        report.changes.len(),
        report.failures
    );

    Ok(RunSummary {
        rules: rules.len(),
        gpus: gpus.len(),
        report,
    })
}
