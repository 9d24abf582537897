//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the `Authorization` scheme and the
//! last used username.
//!
//! Configuration is stored at `~/.config/trsite/config.json`. The
//! `TRSITE_API_URL` and `TRSITE_AUTH_SCHEME` environment variables take
//! precedence over the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_AUTH_SCHEME;

/// Application name used for config/data directory paths
const APP_NAME: &str = "trsite";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";

const ENV_API_URL: &str = "TRSITE_API_URL";
const ENV_AUTH_SCHEME: &str = "TRSITE_AUTH_SCHEME";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub auth_scheme: String,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(scheme) = var(ENV_AUTH_SCHEME).filter(|v| !v.is_empty()) {
            self.auth_scheme = scheme;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory the session store lives in
    pub fn store_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.auth_scheme, "Token");
        assert_eq!(config.last_username, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let config = Config {
            api_base_url: "https://tr.example/api".to_string(),
            auth_scheme: "Bearer".to_string(),
            last_username: Some("jane@doe.com".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://tr.example/api");
        assert_eq!(loaded.auth_scheme, "Bearer");
        assert_eq!(loaded.last_username.as_deref(), Some("jane@doe.com"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"last_username": "jane"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, DEFAULT_API_URL);
        assert_eq!(loaded.last_username.as_deref(), Some("jane"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_API_URL => Some("https://override/api".to_string()),
            ENV_AUTH_SCHEME => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://override/api");
        // Empty values are ignored
        assert_eq!(config.auth_scheme, "Token");
    }
}
