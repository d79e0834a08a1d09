use tracing::{debug, info, warn};

use crate::{
    command::CommandRunner,
    error_log::ErrorLog,
    power_limits::PowerLimitRule,
    smi::{
        Gpu, SENTINEL,
        confirmation::{PowerLimitConfirmation, parse_power_limit_output},
        set_power_limit_command,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerChangeResult {
    pub gpu_index: u32,
    pub model: String,
    pub old_limit: u32,
    pub new_limit: u32,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub changes: Vec<PowerChangeResult>,
    pub failures: usize,
}

/// Apply every matching rule to every GPU, in configuration order.
///
/// A failure on one GPU is recorded and the next GPU is processed anyway.
pub async fn apply_power_limits<R: CommandRunner>(
    runner: &R,
    rules: &[PowerLimitRule],
    gpus: &[Gpu],
    error_log: &ErrorLog,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for gpu in gpus {
        let matching: Vec<&PowerLimitRule> =
            rules.iter().filter(|rule| rule.matches(&gpu.model)).collect();

        match matching.len() {
            0 => {
                debug!("No power limit for GPU {} \"{}\"", gpu.index, gpu.model);
                continue;
            }
            1 => {}
            n => warn!(
                "{n} rules match GPU {} \"{}\", the last one wins",
                gpu.index, gpu.model
            ),
        }

        for rule in matching {
            let command = set_power_limit_command(gpu.index, rule.limit);

            let output = match runner.run(&command).await {
                Ok(output) => output,
                Err(err) => {
                    report.failures += 1;
                    error_log.record("apply_power_limits", &err);
                    continue;
                }
            };

            let confirmation = parse_power_limit_output(&output)
                .unwrap_or_else(|err| {
                    warn!("GPU {}: {err}, output was \"{}\"", gpu.index, output.trim());

                    PowerLimitConfirmation {
                        gpu: SENTINEL,
                        old_limit: SENTINEL,
                        new_limit: SENTINEL,
                    }
                });

            let change = PowerChangeResult {
                gpu_index: gpu.index,
                model: gpu.model.clone(),
                old_limit: confirmation.old_limit,
                new_limit: confirmation.new_limit,
            };

            println!(
                "GPU {} ({}): power limit set from {} W to {} W",
                change.gpu_index, change.model, change.old_limit, change.new_limit
            );
            info!(
                "Applied \"{}\" rule ({} W) to GPU {}",
                rule.model_substring, rule.limit, gpu.index
            );

            report.changes.push(change);
        }
    }

    report
}
