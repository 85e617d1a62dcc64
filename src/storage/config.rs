//! Configuration management

use crate::error::{Result, YtdlProError};
use crate::types::Config;
use crate::utils::paths::get_config_path;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Settings given on the command line; they win over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<String>,
    pub tool_dir: Option<String>,
}

/// Load configuration from the default location
pub async fn load_config() -> Result<Config> {
    load_config_from(&PathBuf::from(get_config_path())).await
}

/// Load configuration from `path`, falling back to defaults when it does not exist
pub async fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| YtdlProError::InvalidConfig(format!("{}: {}", path.display(), e)))?;

    validate(&config)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Apply command-line overrides on top of a loaded config
pub fn apply_overrides(mut config: Config, overrides: ConfigOverrides) -> Config {
    if let Some(dir) = overrides.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = overrides.tool_dir {
        config.tool_dir = Some(dir);
    }
    config
}

fn validate(config: &Config) -> Result<()> {
    if config.output_dir.trim().is_empty() {
        return Err(YtdlProError::InvalidConfig("output_dir must not be empty".into()));
    }
    if config.metadata_timeout_secs == 0 {
        return Err(YtdlProError::InvalidConfig(
            "metadata_timeout_secs must be greater than zero".into(),
        ));
    }
    Ok(())
}
