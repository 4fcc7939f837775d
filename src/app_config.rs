//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omegadl_core::ConfigError;
use omegadl_core::policy::MAX_WORKER_COUNT;
use serde::Deserialize;

/// Highest accepted retry count, matching the CLI range.
const MAX_RETRIES_LIMIT: u32 = 10;

/// TOML-backed file configuration for omegadl defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default output root.
    pub output_dir: Option<PathBuf>,
    /// Default concurrent page downloads per chapter (1..=100).
    pub workers: Option<usize>,
    /// Default retries after a transient failure (0..=10).
    pub max_retries: Option<u32>,
    /// Rebuild existing documents by default.
    pub overwrite: Option<bool>,
    /// Print the per-page report by default.
    pub verbose: Option<bool>,
    /// HTTP connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// HTTP per-request timeout in seconds (1..=3600).
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(workers) = self.workers
            && !(1..=MAX_WORKER_COUNT).contains(&workers)
        {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                value: workers.to_string(),
                expected: "range 1..=100",
            });
        }
        if let Some(max_retries) = self.max_retries
            && max_retries > MAX_RETRIES_LIMIT
        {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                value: max_retries.to_string(),
                expected: "range 0..=10",
            });
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
            expected: "range 1..=3600",
        });
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/omegadl/config.toml`
/// 2. `$HOME/.config/omegadl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("omegadl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("omegadl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional; a missing file
/// yields `None`.
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid TOML, has unknown keys,
/// or holds out-of-range values.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit_path {
        return load_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.is_file() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
