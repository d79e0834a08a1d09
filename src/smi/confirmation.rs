// Parser for the text "nvidia-smi -i <index> -pl <watts>" prints on success:
//
//   Power limit for GPU 00000000:01:00.0 was set to 250.00 W from 300.00 W.
//
// The values are taken at fixed token positions, any field that doesn't
// parse is replaced by the sentinel.

use super::{ParseError, SENTINEL};

const CONFIRMATION_MARKER: &str = "Power limit for GPU";

const GPU_FIELD: usize = 4;
// "set to <new> W from <old> W": the new value comes first
const NEW_LIMIT_FIELD: usize = 8;
const OLD_LIMIT_FIELD: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerLimitConfirmation {
    pub gpu: u32,
    pub old_limit: u32,
    pub new_limit: u32,
}

pub fn parse_power_limit_output(
    output: &str,
) -> Result<PowerLimitConfirmation, ParseError> {
    let line = output
        .lines()
        .find(|line| line.contains(CONFIRMATION_MARKER))
        .ok_or(ParseError::MissingConfirmation)?;

    let fields: Vec<&str> = line.split_whitespace().collect();

    Ok(PowerLimitConfirmation {
        gpu: fields
            .get(GPU_FIELD)
            .and_then(|f| f.parse().ok())
            .unwrap_or(SENTINEL),
        old_limit: watts(fields.get(OLD_LIMIT_FIELD)),
        new_limit: watts(fields.get(NEW_LIMIT_FIELD)),
    })
}

// "250.00" -> 250
fn watts(field: Option<&&str>) -> u32 {
    field
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|w| w.is_finite() && *w >= 0.0 && *w < u32::MAX as f64)
        .map(|w| w.round() as u32)
        .unwrap_or(SENTINEL)
}
