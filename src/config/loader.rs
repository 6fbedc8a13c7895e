//! Configuration loader from ~/.sandbox-guard.json.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::schema::SandboxRuntimeConfig;
use crate::error::{ConfigError, SandboxError};

const DEFAULT_SETTINGS_FILE: &str = ".sandbox-guard.json";

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "SANDBOX_GUARD_CONFIG";

/// `$SANDBOX_GUARD_CONFIG`, else `~/.sandbox-guard.json`.
pub fn default_settings_path() -> Option<PathBuf> {
    match std::env::var_os(SETTINGS_PATH_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(DEFAULT_SETTINGS_FILE)),
    }
}

/// Read, parse and validate a settings file.
pub fn load_config(path: &Path) -> Result<SandboxRuntimeConfig, SandboxError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
        _ => ConfigError::ParseError(format!("{}: {}", path.display(), e)),
    })?;

    tracing::debug!("Loaded sandbox settings from {}", path.display());
    parse_config(&content)
}

/// Load the default settings file. A missing file yields the default config;
/// an unreadable or invalid one is an error.
pub fn load_default_config() -> Result<SandboxRuntimeConfig, SandboxError> {
    let Some(path) = default_settings_path() else {
        return Ok(SandboxRuntimeConfig::default());
    };

    match load_config(&path) {
        Err(SandboxError::Config(ConfigError::FileNotFound(_))) => {
            Ok(SandboxRuntimeConfig::default())
        }
        other => other,
    }
}

/// Parse configuration from a JSON string.
pub fn parse_config(json: &str) -> Result<SandboxRuntimeConfig, SandboxError> {
    let config = serde_json::from_str::<SandboxRuntimeConfig>(json)
        .map_err(|e| ConfigError::ParseError(format!("invalid settings JSON: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate configuration handed over by an embedding process.
/// Blank, malformed or invalid input gives `None`.
pub fn load_config_from_string(content: &str) -> Option<SandboxRuntimeConfig> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    parse_config(content)
        .map_err(|e| tracing::debug!("Ignoring settings string: {}", e))
        .ok()
}
