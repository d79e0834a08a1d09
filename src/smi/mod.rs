//! Everything that knows about the `nvidia-smi` command line and its output.

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    command::{CommandError, CommandRunner},
    error_log::ErrorLog,
};

pub mod confirmation;

pub const LIST_GPUS_COMMAND: &str = "nvidia-smi -L";

// Placeholder for numeric fields that can't be parsed
pub const SENTINEL: u32 = 999;

// Every device line of "nvidia-smi -L" contains this
const GPU_MARKER: &str = "GPU ";
const UUID_MARKER: &str = "(UUID:";

#[derive(Debug, Error)]
pub enum SmiError {
    #[error("nvidia-smi not found, please check if it is installed on your system")]
    UtilityMissing(#[source] CommandError),
    #[error(transparent)]
    Command(CommandError),
}

impl From<CommandError> for SmiError {
    fn from(err: CommandError) -> Self {
        if err.is_not_found() {
            SmiError::UtilityMissing(err)
        } else {
            SmiError::Command(err)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("can not parse line, no ':' separator: \"{0}\"")]
    MissingSeparator(String),
    #[error("can not parse line, no UUID field: \"{0}\"")]
    MissingUuid(String),
    #[error("no power limit confirmation in the output")]
    MissingConfirmation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpu {
    pub index: u32,
    pub model: String,
    pub uuid: String,
}

/// Build the command setting the power limit, in watts, of one GPU.
pub fn set_power_limit_command(index: u32, limit: u32) -> String {
    format!("nvidia-smi -i {index} -pl {limit}")
}

/// Parse one `GPU <index>: <model> (UUID: <uuid>)` line.
///
/// An index that isn't a number is replaced by [`SENTINEL`] instead of
/// failing the line.
pub fn parse_gpu_line(line: &str) -> Result<Gpu, ParseError> {
    let (head, tail) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MissingSeparator(line.to_string()))?;

    let index = head
        .split_whitespace()
        .nth(1)
        .and_then(|num| num.parse().ok())
        .unwrap_or(SENTINEL);

    let (model, uuid) = tail
        .split_once(UUID_MARKER)
        .ok_or_else(|| ParseError::MissingUuid(line.to_string()))?;

    Ok(Gpu {
        index,
        model: model.trim().to_string(),
        uuid: uuid.trim().trim_end_matches(')').trim_end().to_string(),
    })
}

/// List the GPUs reported by `nvidia-smi -L`.
///
/// Lines that look like a device but can't be parsed are logged and
/// skipped; only a failure to run the command is an error.
pub async fn list_gpus<R: CommandRunner>(
    runner: &R,
    error_log: &ErrorLog,
) -> Result<Vec<Gpu>, SmiError> {
    let output = runner.run(LIST_GPUS_COMMAND).await?;

    let mut gpus = Vec::new();

    for line in output.lines() {
        if !line.contains(GPU_MARKER) {
            if !line.trim().is_empty() {
                trace!("Ignoring non device line: \"{line}\"");
            }
            continue;
        }

        match parse_gpu_line(line) {
            Ok(gpu) => {
                debug!("Found GPU {}: \"{}\" ({})", gpu.index, gpu.model, gpu.uuid);
                gpus.push(gpu);
            }
            Err(err) => {
                warn!("Skipping line: {err}");
                error_log.record("list_gpus", &err);
            }
        }
    }

    Ok(gpus)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use super::*;

    // Replays canned results and remembers every command it was given
    #[derive(Default)]
    pub(crate) struct FakeRunner {
        pub commands: RefCell<Vec<String>>,
        pub responses: RefCell<VecDeque<Result<String, CommandError>>>,
    }

    impl FakeRunner {
        pub fn with(responses: Vec<Result<String, CommandError>>) -> Self {
            Self {
                commands: RefCell::new(Vec::new()),
                responses: RefCell::new(responses.into()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(&self, command: &str) -> Result<String, CommandError> {
            self.commands.borrow_mut().push(command.to_string());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    pub(crate) fn failed(command: &str, code: i32) -> CommandError {
        CommandError::Failed {
            command: command.to_string(),
            code: Some(code),
            stderr: String::new(),
        }
    }

    fn error_log() -> (tempfile::TempDir, ErrorLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errors.log"));
        (dir, log)
    }

    #[test]
    fn parses_well_formed_line() {
        let gpu = parse_gpu_line("GPU 2: Model X (UUID: ABC-123)").unwrap();

        assert_eq!(
            gpu,
            Gpu {
                index: 2,
                model: "Model X".to_string(),
                uuid: "ABC-123".to_string(),
            }
        );
    }

    #[test]
    fn parses_real_listing_line() {
        let gpu = parse_gpu_line(
            "GPU 0: NVIDIA GeForce RTX 3090 (UUID: GPU-5a1b2c3d-0e0f-1a2b-3c4d-5e6f7a8b9c0d)",
        )
        .unwrap();

        assert_eq!(gpu.index, 0);
        assert_eq!(gpu.model, "NVIDIA GeForce RTX 3090");
        assert_eq!(gpu.uuid, "GPU-5a1b2c3d-0e0f-1a2b-3c4d-5e6f7a8b9c0d");
    }

    #[test]
    fn non_numeric_index_becomes_sentinel() {
        let gpu = parse_gpu_line("GPU two: Model X (UUID: ABC-123)").unwrap();
        assert_eq!(gpu.index, SENTINEL);
        assert_eq!(gpu.model, "Model X");

        let gpu = parse_gpu_line("GPU: Model X (UUID: ABC-123)").unwrap();
        assert_eq!(gpu.index, SENTINEL);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(
            parse_gpu_line("GPU 0 Model X"),
            Err(ParseError::MissingSeparator("GPU 0 Model X".to_string()))
        );
        assert_eq!(
            parse_gpu_line("GPU 0: Model X"),
            Err(ParseError::MissingUuid("GPU 0: Model X".to_string()))
        );
    }

    #[test]
    fn builds_set_command() {
        assert_eq!(set_power_limit_command(1, 250), "nvidia-smi -i 1 -pl 250");
    }

    #[tokio::test]
    async fn lists_gpus_skipping_bad_lines() {
        let (_dir, log) = error_log();
        let runner = FakeRunner::with(vec![Ok(concat!(
            "GPU 0: RTX 3090 Ti (UUID: GPU-u1)\n",
            "  MIG 1g.5gb     Device  0: (UUID: MIG-0001)\n",
            "GPU 1 broken line\n",
            "GPU 1: A100-PCIE (UUID: GPU-u2)\n",
            "\n",
        )
        .to_string())]);

        let gpus = list_gpus(&runner, &log).await.unwrap();

        assert_eq!(*runner.commands.borrow(), [LIST_GPUS_COMMAND]);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].model, "RTX 3090 Ti");
        assert_eq!(gpus[1].index, 1);
        assert_eq!(gpus[1].uuid, "GPU-u2");

        let logged = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(logged.lines().count(), 1);
        assert!(logged.contains("list_gpus: can not parse line"));
    }

    #[tokio::test]
    async fn empty_output_is_no_gpus() {
        let (_dir, log) = error_log();
        let runner = FakeRunner::with(vec![Ok(String::new())]);

        assert!(list_gpus(&runner, &log).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_utility_is_reported() {
        let (_dir, log) = error_log();
        let runner =
            FakeRunner::with(vec![Err(failed(LIST_GPUS_COMMAND, 127))]);

        let err = list_gpus(&runner, &log).await.unwrap_err();
        assert!(matches!(err, SmiError::UtilityMissing(_)));
        assert_eq!(
            err.to_string(),
            "nvidia-smi not found, please check if it is installed on your system"
        );
    }

    #[tokio::test]
    async fn other_failures_are_command_errors() {
        let (_dir, log) = error_log();
        let runner = FakeRunner::with(vec![Err(failed(LIST_GPUS_COMMAND, 9))]);

        let err = list_gpus(&runner, &log).await.unwrap_err();
        assert!(matches!(err, SmiError::Command(_)));
    }
}
