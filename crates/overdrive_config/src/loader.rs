//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::OverdriveConfig;
use std::path::Path;

/// File name looked up inside a testbench directory.
pub const CONFIG_FILE_NAME: &str = "overdrive.toml";

/// Loads `<dir>/overdrive.toml`.
///
/// A directory without the file yields the default configuration; any other
/// read failure is an error.
pub fn load_config(dir: &Path) -> Result<OverdriveConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(OverdriveConfig::default())
        }
        Err(source) => return Err(ConfigError::IoError { path, source }),
    };
    parse(&content, &path.display().to_string())
}

/// Parses and validates configuration text that did not come from a file.
pub fn load_config_from_str(content: &str) -> Result<OverdriveConfig, ConfigError> {
    parse(content, "<inline>")
}

fn parse(content: &str, origin: &str) -> Result<OverdriveConfig, ConfigError> {
    let config: OverdriveConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &OverdriveConfig) -> Result<(), ConfigError> {
    if config.simulation.max_deltas == 0 {
        return Err(ConfigError::ValidationError {
            field: "simulation.max_deltas",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
