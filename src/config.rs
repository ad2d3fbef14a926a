use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Optional `config.toml`. Every key has a default; unknown keys are rejected.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub step_delay_ms: u64,
    pub dry_run: bool,
    pub use_sudo: bool,
    pub go_root: String,
    pub download_dir: String,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    pub latest_versions: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            step_delay_ms: 0,
            dry_run: false,
            use_sudo: true,
            go_root: "/usr/local".to_string(),
            download_dir: "~/Downloads/decor".to_string(),
            log_file: None,
            log_level: None,
            latest_versions: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config dir>/decor/config.toml` if it exists, defaults otherwise.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn go_root(&self) -> Result<PathBuf, ConfigError> {
        expand_tilde(&self.go_root)
    }

    pub fn download_dir(&self) -> Result<PathBuf, ConfigError> {
        expand_tilde(&self.download_dir)
    }

    /// Configured log file, else `<cache dir>/decor/decor.log`.
    pub fn log_file(&self) -> Result<PathBuf, ConfigError> {
        match self.log_file.as_deref() {
            Some(path) => expand_tilde(path),
            None => dirs::cache_dir()
                .map(|dir| dir.join("decor").join("decor.log"))
                .ok_or(ConfigError::NoHome),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("decor").join("config.toml"))
}

pub fn expand_tilde(input: &str) -> Result<PathBuf, ConfigError> {
    if input == "~" {
        return dirs::home_dir().ok_or(ConfigError::NoHome);
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return Ok(dirs::home_dir().ok_or(ConfigError::NoHome)?.join(rest));
    }
    Ok(PathBuf::from(input))
}
