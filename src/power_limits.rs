use std::{fs, io, path::{Path, PathBuf}};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const POWER_LIMITS_URL: &str =
    "https://raw.githubusercontent.com/evilcloud/GPU_power_limit/main/gpu_power.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to fetch the power limits from {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read the power limits file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed power limits document")]
    Decode(#[from] serde_json::Error),
}

// A model name fragment and the power limit, in watts,
// applied to every GPU whose model contains it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PowerLimitRule {
    #[serde(rename = "model")]
    pub model_substring: String,
    pub limit: u32,
}

impl PowerLimitRule {
    pub fn matches(&self, model: &str) -> bool {
        model.contains(self.model_substring.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct PowerLimitsDocument {
    power_limits: Vec<PowerLimitRule>,
}

/// Decode the `{ "power_limits": [...] }` document.
pub fn decode_power_limits(
    bytes: &[u8],
) -> Result<Vec<PowerLimitRule>, ConfigError> {
    let document: PowerLimitsDocument = serde_json::from_slice(bytes)?;

    Ok(document.power_limits)
}

/// Download and decode the power limits document. No retries.
pub async fn fetch_power_limits(
    client: &Client,
    url: &str,
) -> Result<Vec<PowerLimitRule>, ConfigError> {
    debug!("Fetching power limits from {url}");

    let network = |source| ConfigError::Network {
        url: url.to_string(),
        source,
    };

    let body = client
        .get(url)
        .send()
        .await
        .and_then(|res| res.error_for_status())
        .map_err(network)?
        .bytes()
        .await
        .map_err(network)?;

    decode_power_limits(&body)
}

pub fn load_power_limits_file(
    path: &Path,
) -> Result<Vec<PowerLimitRule>, ConfigError> {
    debug!("Reading power limits from {path:?}");

    let bytes = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    decode_power_limits(&bytes)
}
