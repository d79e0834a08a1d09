use thiserror::Error;

use crate::{power_limits::ConfigError, smi::SmiError};

// The main error type, any of these ends the run
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Smi(#[from] SmiError),
}
