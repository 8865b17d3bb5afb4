use std::fs;
use std::path::Path;

use thiserror::Error;
use xpad360_driver::DriverSettings;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml deserialize error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parses driver settings. An empty document means defaults.
pub(crate) fn parse_settings(input: &str) -> Result<DriverSettings, ConfigError> {
    if input.trim().is_empty() {
        return Ok(DriverSettings::default());
    }
    Ok(serde_yaml::from_str(input)?)
}

pub(crate) fn load_settings(path: Option<&Path>) -> Result<DriverSettings, ConfigError> {
    match path {
        Some(path) => parse_settings(&fs::read_to_string(path)?),
        None => Ok(DriverSettings::default()),
    }
}
