//! Config file loader and serialization.

use crate::config::RunConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Supported on-disk formats, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some(ext) => Err(ConfigError::UnsupportedFormat(format!(
                "expected .json or .toml, got .{}",
                ext
            ))),
            None => Err(ConfigError::UnsupportedFormat(
                "configuration file has no extension".to_string(),
            )),
        }
    }
}

/// Get the default run config path: ~/.config/infra-lifecycle/run.toml
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine config directory".to_string())
    })?;
    Ok(config_dir.join("infra-lifecycle").join("run.toml"))
}

/// Load a run config from a `.json` or `.toml` file.
pub fn load_config_from_file(path: &Path) -> Result<RunConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    parse_config(&content, format)
}

/// Parse config text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RunConfig, ConfigError> {
    let config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Save a run config, choosing the format from the extension.
pub fn save_config_to_file(config: &RunConfig, path: &Path) -> Result<(), ConfigError> {
    let format = ConfigFormat::from_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
    };
    fs::write(path, content)?;
    Ok(())
}
