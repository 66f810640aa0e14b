//! Backup of the running executable for the duration of a swap.
//!
//! The backup lives beside the executable as `<exe>.backup`. It is created
//! before anything else is touched and removed once the swap has either
//! succeeded or been rolled back; it survives only when the original could
//! not be restored, so the user can copy it back by hand.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{BurrowError, Result};
use crate::utils::progress::ProgressSink;

use super::replace::{copy_file, path_with_suffix};

/// Manages `<exe>.backup` for one executable.
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
    progress: Arc<dyn ProgressSink>,
}

impl BackupManager {
    /// Create a manager for `executable_path`. Nothing is written yet.
    pub fn new(executable_path: PathBuf, progress: Arc<dyn ProgressSink>) -> Self {
        let backup_path = path_with_suffix(&executable_path, ".backup");
        Self {
            original_path: executable_path,
            backup_path,
            progress,
        }
    }

    /// Copy the executable to the backup path, replacing any stale backup.
    pub async fn create(&self, cancel: &CancellationToken) -> Result<()> {
        let fail = |reason: String| BurrowError::BackupError {
            path: self.original_path.display().to_string(),
            reason,
        };

        if !self.original_path.exists() {
            return Err(fail("executable does not exist".to_string()));
        }

        if self.backup_path.exists() {
            debug!("Removing stale backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path)
                .await
                .map_err(|e| fail(format!("could not remove stale backup: {e}")))?;
        }

        info!("Creating backup at {}", self.backup_path.display());
        match copy_file(&self.original_path, &self.backup_path, &*self.progress, "Backing up", cancel)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                self.discard().await;
                match e {
                    BurrowError::Cancelled { .. } => Err(e),
                    other => Err(fail(other.to_string())),
                }
            }
        }
    }

    /// Copy the backup over the executable path.
    pub async fn restore(&self) -> Result<()> {
        if !self.backup_path.exists() {
            return Err(BurrowError::fs(
                "restore from",
                &self.backup_path,
                io::Error::new(io::ErrorKind::NotFound, "backup not found"),
            ));
        }

        warn!("Restoring from backup at {}", self.backup_path.display());
        if self.original_path.exists() {
            fs::remove_file(&self.original_path)
                .await
                .map_err(|e| BurrowError::fs("remove", &self.original_path, e))?;
        }

        copy_file(
            &self.backup_path,
            &self.original_path,
            &*self.progress,
            "Restoring",
            &CancellationToken::new(),
        )
        .await?;
        info!("Restored {} from backup", self.original_path.display());
        Ok(())
    }

    /// Delete the backup. Failure is logged and otherwise ignored.
    pub async fn cleanup(&self) {
        if self.backup_path.exists() {
            debug!("Cleaning up backup at {}", self.backup_path.display());
            self.discard().await;
        }
    }

    async fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.backup_path).await
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to remove backup {}: {e}", self.backup_path.display());
        }
    }

    /// Whether the backup file currently exists.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Path of the backup file.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
