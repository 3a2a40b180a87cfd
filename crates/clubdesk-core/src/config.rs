//! Application configuration management.
//!
//! Holds the backend location, timeouts, which token store to use, and the
//! last email used to log in.
//!
//! Configuration is stored at `~/.config/clubdesk/config.json`. The
//! `CLUBDESK_API_URL` environment variable overrides the stored API root.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyringStore, MemoryStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "clubdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "CLUBDESK_API_URL";

/// Backend root used when nothing else is configured
pub const DEFAULT_API_ROOT: &str = "http://localhost:8080";

/// Prefix of every authenticated endpoint
const API_PREFIX: &str = "/api/v1";

/// Prefix of the anonymous endpoints
const PUBLIC_PREFIX: &str = "/public";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on a token refresh call, in seconds.
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    Keyring,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub token_store: TokenStoreKind,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            token_store: TokenStoreKind::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Config pointing at a specific backend, ignoring files and environment.
    pub fn for_api_root(api_root: &str) -> Self {
        Self {
            api_url: Some(api_root.to_string()),
            ..Self::default()
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = Some(url);
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend root without a trailing slash.
    pub fn api_root(&self) -> String {
        self.api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_ROOT)
            .trim_end_matches('/')
            .to_string()
    }

    /// `<api-root>/api/v1`
    pub fn api_base_url(&self) -> String {
        format!("{}{}", self.api_root(), API_PREFIX)
    }

    /// `<api-root>/public`
    pub fn public_base_url(&self) -> String {
        format!("{}{}", self.api_root(), PUBLIC_PREFIX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Build the configured token store.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_store {
            TokenStoreKind::Keyring => Arc::new(KeyringStore::new()),
            TokenStoreKind::File => Arc::new(FileStore::new(self.cache_dir()?)),
            TokenStoreKind::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls_strip_trailing_slash() {
        let config = Config::for_api_root("https://clubs.example.com/");
        assert_eq!(config.api_base_url(), "https://clubs.example.com/api/v1");
        assert_eq!(config.public_base_url(), "https://clubs.example.com/public");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), "http://localhost:8080/api/v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.refresh_timeout(), Duration::from_secs(15));
        assert_eq!(config.token_store, TokenStoreKind::Keyring);
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url":"http://api:9000","token_store":"file"}"#)
                .expect("parse config");
        assert_eq!(config.api_root(), "http://api:9000");
        assert_eq!(config.token_store, TokenStoreKind::File);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
