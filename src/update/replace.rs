//! Transactional replacement of the running executable.
//!
//! ```text
//! Start ─► BackedUp ─► Swapped ─► CleanedUp
//!              │
//!              ├─► RestoreAttempted ─► Failed
//!              │
//!              └─► DeferredScriptWritten ─► Pending      (locked executable)
//! ```
//!
//! The executable is backed up, moved aside to a sibling path chosen by the
//! [`PlatformStrategy`], and the new binary is copied into its place. If the
//! copy fails the sibling is moved back, and if that fails too the backup is
//! copied back. Only when both recovery steps fail is [`BurrowError::RestoreError`]
//! returned, and the backup is then left on disk.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{BurrowError, Result};
use crate::utils::path_validation::validate_file_path;
use crate::utils::progress::{ProgressReader, ProgressSink};

use super::backup::BackupManager;
use super::strategy::PlatformStrategy;

/// Successful result of [`ExecutableReplacer::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The new executable is in place.
    Completed,
    /// The executable was locked; `script` finishes the swap after exit.
    DeferredPendingRestart {
        /// The deferred update script.
        script: PathBuf,
    },
}

/// States of the swap, logged as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    /// Nothing touched yet.
    Start,
    /// `<exe>.backup` exists.
    BackedUp,
    /// New executable copied into place.
    Swapped,
    /// Sibling and backup removed.
    CleanedUp,
    /// Copy failed; putting the original back.
    RestoreAttempted,
    /// Recovery failed.
    Failed,
    /// Deferred script written beside the executable.
    DeferredScriptWritten,
    /// Deferred script launched.
    Pending,
}

/// Append `suffix` to the final component of `path`.
pub fn path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy `src` to `dst` byte for byte, then give `dst` the permissions of `src`.
///
/// `dst` is created or truncated. A partially written `dst` is left for the
/// caller to clean up.
pub async fn copy_file(
    src: &Path,
    dst: &Path,
    progress: &dyn ProgressSink,
    label: &str,
    cancel: &CancellationToken,
) -> Result<u64> {
    validate_file_path(src)?;
    validate_file_path(dst)?;

    let source = fs::File::open(src).await.map_err(|e| BurrowError::fs("open", src, e))?;
    let metadata = source.metadata().await.map_err(|e| BurrowError::fs("stat", src, e))?;
    let mut dest = fs::File::create(dst).await.map_err(|e| BurrowError::fs("create", dst, e))?;

    let len = metadata.len();
    let mut reader: Box<dyn AsyncRead + Unpin + Send> = if len > 0 {
        Box::new(ProgressReader::new(source, len, progress.start(label, len)))
    } else {
        Box::new(source)
    };

    let copied = tokio::select! {
        biased;

        () = cancel.cancelled() => {
            return Err(BurrowError::Cancelled {
                operation: format!("copy to {}", dst.display()),
            });
        }
        result = tokio::io::copy(&mut reader, &mut dest) => result,
    };
    let bytes = copied.map_err(|e| BurrowError::fs("copy", dst, e))?;
    dest.flush().await.map_err(|e| BurrowError::fs("flush", dst, e))?;
    drop(dest);

    fs::set_permissions(dst, metadata.permissions())
        .await
        .map_err(|e| BurrowError::fs("set permissions on", dst, e))?;
    Ok(bytes)
}

fn enter(state: &mut SwapState, next: SwapState) {
    debug!("Swap state {state:?} -> {next:?}");
    *state = next;
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(BurrowError::Cancelled {
            operation: "replace executable".to_string(),
        });
    }
    Ok(())
}

/// Swaps the executable at one path for the file at another.
pub struct ExecutableReplacer<S> {
    strategy: S,
    progress: Arc<dyn ProgressSink>,
}

impl<S: PlatformStrategy> ExecutableReplacer<S> {
    /// Create a replacer using `strategy` for the platform-specific steps.
    pub fn new(strategy: S, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            strategy,
            progress,
        }
    }

    /// Replace `current` with the contents of `new`.
    ///
    /// Cancellation is honoured up to the moment the executable is moved
    /// aside; after that the swap runs to completion or rollback. `new` is
    /// never deleted here.
    pub async fn replace(
        &self,
        current: &Path,
        new: &Path,
        cancel: &CancellationToken,
    ) -> Result<ReplaceOutcome> {
        validate_file_path(current)?;
        validate_file_path(new)?;
        let sibling = self.strategy.sibling_path(current);
        validate_file_path(&sibling)?;
        check_cancelled(cancel)?;

        let mut state = SwapState::Start;
        info!("Replacing {} using the {} strategy", current.display(), self.strategy.name());

        let backup = BackupManager::new(current.to_path_buf(), self.progress.clone());
        backup.create(cancel).await?;
        enter(&mut state, SwapState::BackedUp);

        if let Err(e) = check_cancelled(cancel) {
            backup.cleanup().await;
            return Err(e);
        }

        if let Err(err) = fs::rename(current, &sibling).await {
            backup.cleanup().await;
            let outcome = self.strategy.on_move_aside_failed(current, new, err).await?;
            enter(&mut state, SwapState::DeferredScriptWritten);
            enter(&mut state, SwapState::Pending);
            return Ok(outcome);
        }

        let install =
            copy_file(new, current, &*self.progress, "Installing", &CancellationToken::new()).await;

        match install {
            Ok(_) => {
                enter(&mut state, SwapState::Swapped);
                if let Err(e) = fs::remove_file(&sibling).await {
                    warn!("Failed to remove old executable {}: {e}", sibling.display());
                }
                if let Err(e) = self.strategy.finalize(current).await {
                    warn!("Failed to finalize {}: {e}", current.display());
                }
                backup.cleanup().await;
                enter(&mut state, SwapState::CleanedUp);
                info!("Replaced {}", current.display());
                Ok(ReplaceOutcome::Completed)
            }
            Err(copy_err) => {
                enter(&mut state, SwapState::RestoreAttempted);
                warn!("Installing the new executable failed: {copy_err}");
                match rollback(current, &sibling, &backup).await {
                    Ok(()) => {
                        backup.cleanup().await;
                        Err(BurrowError::SwapError {
                            path: current.display().to_string(),
                            reason: copy_err.to_string(),
                        })
                    }
                    Err(restore_err) => {
                        enter(&mut state, SwapState::Failed);
                        Err(restore_err)
                    }
                }
            }
        }
    }
}

/// Put the original executable back after a failed install.
///
/// The sibling is renamed back over whatever the install left at `current`;
/// the backup copy is the fallback.
pub async fn rollback(current: &Path, sibling: &Path, backup: &BackupManager) -> Result<()> {
    let rename_err = match fs::rename(sibling, current).await {
        Ok(()) => {
            info!("Moved the original executable back into place");
            return Ok(());
        }
        Err(e) => e,
    };
    warn!("Moving {} back failed: {rename_err}", sibling.display());

    if let Err(e) = fs::remove_file(current).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("Failed to remove partial executable {}: {e}", current.display());
    }

    match backup.restore().await {
        Ok(()) => Ok(()),
        Err(restore_err) => {
            error!(
                "Could not restore {}; the original is still at {}",
                current.display(),
                backup.backup_path().display()
            );
            Err(BurrowError::RestoreError {
                path: current.display().to_string(),
                backup: backup.backup_path().display().to_string(),
                reason: format!("{rename_err}; {restore_err}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::DeferringStrategy;
    use crate::update::strategy::{PosixStrategy, WindowsStrategy};
    use crate::utils::progress::NoProgress;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let current = temp.path().join("burrow");
        let new = temp.path().join("burrow-update-burrow-linux-amd64");
        tokio::fs::write(&current, b"old binary").await.unwrap();
        tokio::fs::write(&new, b"new binary").await.unwrap();
        (temp, current, new)
    }

    fn replacer() -> ExecutableReplacer<PosixStrategy> {
        ExecutableReplacer::new(PosixStrategy, Arc::new(NoProgress))
    }

    fn leftovers(temp: &TempDir) -> Vec<String> {
        std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".backup") || name.contains(".old"))
            .collect()
    }

    #[test]
    fn test_path_with_suffix() {
        assert_eq!(path_with_suffix(Path::new("/a/burrow"), ".backup"), PathBuf::from("/a/burrow.backup"));
        assert_eq!(path_with_suffix(Path::new("burrow.exe"), ".old"), PathBuf::from("burrow.exe.old"));
    }

    #[tokio::test]
    async fn test_copy_file_copies_bytes_and_permissions() {
        let (temp, current, _) = setup().await;
        let dst = temp.path().join("copy");
        let bytes = copy_file(&current, &dst, &NoProgress, "Copying", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bytes, 10);
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"old binary");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let src_mode = std::fs::metadata(&current).unwrap().permissions().mode();
            let dst_mode = std::fs::metadata(&dst).unwrap().permissions().mode();
            assert_eq!(src_mode, dst_mode);
        }
    }

    #[tokio::test]
    async fn test_copy_file_rejects_traversal() {
        let err = copy_file(
            Path::new("/tmp/../etc/passwd"),
            Path::new("/tmp/out"),
            &NoProgress,
            "Copying",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BurrowError::PathValidation { .. }));
    }

    #[tokio::test]
    async fn test_successful_replace() {
        let (temp, current, new) = setup().await;
        let outcome = replacer().replace(&current, &new, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ReplaceOutcome::Completed);
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"new binary");
        assert!(new.exists(), "the downloaded file belongs to the caller");
        assert!(leftovers(&temp).is_empty(), "left behind: {:?}", leftovers(&temp));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&current).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_failed_install_restores_original() {
        let (temp, current, _) = setup().await;
        let missing = temp.path().join("never-downloaded");

        let err = replacer().replace(&current, &missing, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, BurrowError::SwapError { .. }), "{err:?}");
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
        assert!(leftovers(&temp).is_empty());
    }

    #[tokio::test]
    async fn test_directory_as_new_executable_rolls_back() {
        let (temp, current, _) = setup().await;
        let dir = temp.path().join("not-a-binary");
        tokio::fs::create_dir(&dir).await.unwrap();

        let err = replacer().replace(&current, &dir, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, BurrowError::SwapError { .. }));
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_changes_nothing() {
        let (temp, current, new) = setup().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = replacer().replace(&current, &new, &cancel).await.unwrap_err();
        assert!(matches!(err, BurrowError::Cancelled { .. }));
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
        assert!(leftovers(&temp).is_empty());
    }

    #[tokio::test]
    async fn test_missing_executable_is_backup_error() {
        let (temp, _, new) = setup().await;
        let err = replacer()
            .replace(&temp.path().join("gone"), &new, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BurrowError::BackupError { .. }));
    }

    #[tokio::test]
    async fn test_rollback_renames_sibling_over_partial_install() {
        let (temp, current, _) = setup().await;
        let sibling = temp.path().join("burrow.old.1");
        tokio::fs::rename(&current, &sibling).await.unwrap();
        tokio::fs::write(&current, b"half written").await.unwrap();
        let backup = BackupManager::new(current.clone(), Arc::new(NoProgress));

        rollback(&current, &sibling, &backup).await.unwrap();
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
        assert!(!sibling.exists());
    }

    #[tokio::test]
    async fn test_locked_executable_hands_off_to_strategy() {
        let (temp, current, new) = setup().await;
        tokio::fs::create_dir(temp.path().join("occupied")).await.unwrap();
        let replacer = ExecutableReplacer::new(DeferringStrategy, Arc::new(NoProgress));

        let outcome = replacer.replace(&current, &new, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            outcome,
            ReplaceOutcome::DeferredPendingRestart {
                script: temp.path().join("update_burrow.bat")
            }
        );
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
        assert!(new.exists());
        assert!(leftovers(&temp).is_empty(), "left behind: {:?}", leftovers(&temp));
    }

    #[tokio::test]
    async fn test_rollback_falls_back_to_backup() {
        let (temp, current, _) = setup().await;
        let backup = BackupManager::new(current.clone(), Arc::new(NoProgress));
        backup.create(&CancellationToken::new()).await.unwrap();
        tokio::fs::write(&current, b"half written").await.unwrap();

        rollback(&current, &temp.path().join("no-sibling"), &backup).await.unwrap();
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"old binary");
    }

    #[tokio::test]
    async fn test_rollback_without_sibling_or_backup_is_critical() {
        let (temp, current, _) = setup().await;
        let backup = BackupManager::new(current.clone(), Arc::new(NoProgress));

        let err = rollback(&current, &temp.path().join("no-sibling"), &backup).await.unwrap_err();
        assert!(err.is_critical());
        assert!(matches!(err, BurrowError::RestoreError { ref backup, .. } if backup.ends_with("burrow.backup")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_windows_strategy_completes_when_rename_succeeds() {
        let (temp, current, new) = setup().await;
        let replacer = ExecutableReplacer::new(WindowsStrategy, Arc::new(NoProgress));

        let outcome = replacer.replace(&current, &new, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Completed);
        assert_eq!(tokio::fs::read(&current).await.unwrap(), b"new binary");
        assert!(leftovers(&temp).is_empty());
    }
}
