use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{
    model::UserPreferences,
    provider::openweather::{DEFAULT_BASE_URL, DEFAULT_LANGUAGE},
    store::{DEFAULT_HISTORY_LIMIT, StoreSettings},
};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// language = "en"
/// cache_ttl_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Language of condition descriptions, e.g. "pl" or "en".
    pub language: String,
    /// Directory holding persisted history, favorites and preferences.
    /// Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub history_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            data_dir: None,
            cache_ttl_secs: 300,
            history_limit: DEFAULT_HISTORY_LIMIT,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "citycast", "citycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for the key-value store: the override if set, else the
    /// platform data directory.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(anyhow!("history_limit must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        let trimmed = api_key.trim();
        self.api_key = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn store_settings(&self) -> StoreSettings {
        let ttl_secs = i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX);

        StoreSettings {
            history_limit: self.history_limit,
            cache_ttl: Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX),
            default_preferences: UserPreferences::default(),
        }
    }
}
