//! Global configuration for Burrow.
//!
//! The global configuration file lives at `~/.burrow/config.toml` on every
//! platform. Its location can be overridden with the `BURROW_CONFIG_PATH`
//! environment variable, which the test suite relies on to keep real user
//! configuration out of reach.
//!
//! A missing file is not an error: every setting has a default.
//!
//! # Example
//!
//! ```toml
//! [update]
//! owner = "elaurentium"
//! project = "Burrow"
//! api_base_url = "https://api.github.com"
//! request_timeout_secs = 300
//! connect_timeout_secs = 10
//! temp_prefix = "burrow-update"
//! show_progress = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::core::BurrowError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "BURROW_CONFIG_PATH";

fn default_owner() -> String {
    "elaurentium".to_string()
}

fn default_project() -> String {
    "Burrow".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    300
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_temp_prefix() -> String {
    "burrow-update".to_string()
}

const fn default_show_progress() -> bool {
    true
}

/// Settings for `burrow update` and `burrow check`.
///
/// `api_base_url` may point somewhere else, but the release URL built from it
/// still has to pass the host allow-list before any request goes out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// GitHub account that publishes releases.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Repository name under `owner`.
    #[serde(default = "default_project")]
    pub project: String,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Total deadline for a single HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Deadline for establishing a connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Prefix for the downloaded temp file name.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// Draw progress bars during downloads and copies.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            project: default_project(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            temp_prefix: default_temp_prefix(),
            show_progress: default_show_progress(),
        }
    }
}

impl UpdateConfig {
    /// Total request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Endpoint for the latest release of `owner/project`.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url.trim_end_matches('/'),
            self.owner,
            self.project
        )
    }
}

/// Global configuration structure for Burrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Self-update settings.
    #[serde(default)]
    pub update: UpdateConfig,
}

impl GlobalConfig {
    /// Load the configuration from the default location.
    ///
    /// Returns the default configuration when the file does not exist.
    pub async fn load() -> Result<Self> {
        Self::load_or_default(&Self::default_path()?).await
    }

    /// Load the configuration from `path`, or the defaults if it is absent.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load the configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| BurrowError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(config)
    }

    /// Path of the configuration file, honouring `BURROW_CONFIG_PATH`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(burrow_dir()?.join("config.toml"))
    }
}

/// Burrow's per-user state directory, `~/.burrow`.
pub fn burrow_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| BurrowError::ConfigError {
        message: "Unable to determine home directory".to_string(),
    })?;
    Ok(home.join(".burrow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = UpdateConfig::default();
        assert_eq!(config.owner, "elaurentium");
        assert_eq!(config.project, "Burrow");
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.temp_prefix, "burrow-update");
        assert!(config.show_progress);
        assert_eq!(
            config.latest_release_url(),
            "https://api.github.com/repos/elaurentium/Burrow/releases/latest"
        );
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[update]\nproject = \"Fork\"\nshow_progress = false\n")
            .await
            .unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.update.project, "Fork");
        assert!(!config.update.show_progress);
        assert_eq!(config.update.owner, "elaurentium");
    }

    #[tokio::test]
    async fn test_invalid_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[update\nowner = ").await.unwrap();

        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<BurrowError>(), Some(BurrowError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = GlobalConfig::default();
        config.update.request_timeout_secs = 42;

        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, toml::to_string_pretty(&config).unwrap()).await.unwrap();
        assert_eq!(GlobalConfig::load_from(&path).await.unwrap(), config);
    }

    #[tokio::test]
    #[serial]
    async fn test_env_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &path);
        }

        assert_eq!(GlobalConfig::default_path().unwrap(), path);
        assert_eq!(GlobalConfig::load().await.unwrap(), GlobalConfig::default());

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
    }
}
