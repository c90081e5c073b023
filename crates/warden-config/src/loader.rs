//! Configuration file loading.

use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::GatewayConfig;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load, parse, and validate a gateway config file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file cannot be read,
/// [`ConfigError::ParseError`] if it is not valid TOML for the schema, or
/// [`ConfigError::ValidationError`] if it is too large or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid a stat/read race.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let config = parse(&content, &path.display().to_string())?;
    info!(
        path = %path.display(),
        resources = config.resources.len(),
        "loaded gateway config"
    );
    Ok(config)
}

/// Parse and validate a gateway config from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] or [`ConfigError::ValidationError`].
pub fn from_toml_str(content: &str) -> ConfigResult<GatewayConfig> {
    parse(content, "<string>")
}

fn parse(content: &str, label: &str) -> ConfigResult<GatewayConfig> {
    let config: GatewayConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: label.to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}
