use std::{future::Future, io, process::Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

// Exit code used by the shell when the program can't be found
const SHELL_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start \"{command}\"")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("\"{command}\" exited with {}", failure_detail(.code, .stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl CommandError {
    // True when the failure means the program isn't installed
    pub fn is_not_found(&self) -> bool {
        match self {
            CommandError::Spawn { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            CommandError::Failed { code, .. } => *code == Some(SHELL_NOT_FOUND),
        }
    }
}

// "exit code 4" or "exit code 4: <stderr>" when something was printed
fn failure_detail(code: &Option<i32>, stderr: &str) -> String {
    let code = match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    };

    if stderr.is_empty() {
        code
    } else {
        format!("{code}: {stderr}")
    }
}

/// Runs a shell command line and returns what it wrote to stdout.
pub trait CommandRunner {
    fn run(
        &self,
        command: &str,
    ) -> impl Future<Output = Result<String, CommandError>>;
}

// Run commands through "bash -c", blocking until they exit
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<String, CommandError> {
        trace!("Running \"{command}\"");

        let output = Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr)
                    .trim()
                    .to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
