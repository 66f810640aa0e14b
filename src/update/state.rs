//! Persisted "current version" marker.
//!
//! After an update, or after the user declines one, the release tag is
//! recorded so the same release is not offered again. The marker is scoped to
//! the binary that wrote it: installing a different binary by hand discards it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::config::burrow_dir;
use crate::core::{BurrowError, Result};

use super::version::CURRENT_VERSION;

/// Storage for the acknowledged version marker.
#[allow(async_fn_in_trait)]
pub trait VersionStore {
    /// The stored marker, if any.
    async fn load(&self) -> Option<String>;

    /// Record `version` as acknowledged.
    async fn save(&self, version: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionState {
    acknowledged_version: String,
    binary_version: String,
    updated_at: DateTime<Utc>,
}

/// JSON file store, `~/.burrow/version_state.json` by default.
#[derive(Debug, Clone)]
pub struct FileVersionStore {
    path: PathBuf,
    binary_version: String,
}

impl FileVersionStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            binary_version: CURRENT_VERSION.to_string(),
        }
    }

    /// Store at the default location.
    pub fn default_location() -> anyhow::Result<Self> {
        Ok(Self::new(burrow_dir()?.join("version_state.json")))
    }

    /// Pretend to be a different binary version.
    #[must_use]
    pub fn with_binary_version(mut self, version: impl Into<String>) -> Self {
        self.binary_version = version.into();
        self
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionStore for FileVersionStore {
    async fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        let state: VersionState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                debug!("Ignoring unreadable version state {}: {e}", self.path.display());
                return None;
            }
        };

        if state.binary_version != self.binary_version {
            debug!(
                "Ignoring version marker written by burrow {} (running {})",
                state.binary_version, self.binary_version
            );
            return None;
        }
        Some(state.acknowledged_version)
    }

    async fn save(&self, version: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| BurrowError::fs("create", parent, e))?;
        }

        let state = VersionState {
            acknowledged_version: version.to_string(),
            binary_version: self.binary_version.clone(),
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&state).map_err(|e| BurrowError::ConfigError {
            message: format!("could not serialise version state: {e}"),
        })?;
        fs::write(&self.path, content).await.map_err(|e| BurrowError::fs("write", &self.path, e))?;
        debug!("Recorded {version} as the acknowledged version");
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    version: Mutex<Option<String>>,
}

impl MemoryVersionStore {
    /// A store that already holds `version`.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: Mutex::new(Some(version.into())),
        }
    }

    /// Current contents.
    pub fn get(&self) -> Option<String> {
        self.version.lock().ok().and_then(|guard| guard.clone())
    }
}

impl VersionStore for MemoryVersionStore {
    async fn load(&self) -> Option<String> {
        self.get()
    }

    async fn save(&self, version: &str) -> Result<()> {
        if let Ok(mut guard) = self.version.lock() {
            *guard = Some(version.to_string());
        }
        Ok(())
    }
}
