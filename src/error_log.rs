use std::{
    error::Error,
    fs::OpenOptions,
    io::Write,
    iter,
    path::{Path, PathBuf},
};

use chrono::{Local, SecondsFormat};
use tracing::error;

pub const DEFAULT_ERROR_LOG: &str = "errors.log";

// Append only error log, the file is opened and closed on every record.
// Recording never fails, problems with the file itself are only
// reported through tracing
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, caller: &str, err: &(dyn Error + 'static)) {
        self.record_message(caller, &error_chain(err));
    }

    pub fn record_message(&self, caller: &str, message: &str) {
        error!("{caller}: {message}");

        let line = format!(
            "[{}] [ERROR] {caller}: {message}\n",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) => {
                error!("Failed to open {:?}: {err}", self.path);
                return;
            }
        };

        if let Err(err) = file.write_all(line.as_bytes()) {
            error!("Failed to write to {:?}: {err}", self.path);
        }
    }
}

// Join an error and all of its sources, outermost first
fn error_chain(err: &(dyn Error + 'static)) -> String {
    iter::successors(Some(err), |&e| e.source())
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
