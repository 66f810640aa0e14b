//! Platform-specific halves of the executable swap.
//!
//! POSIX systems let a running executable be renamed, so the swap moves it
//! aside and copies the new binary into place. Windows usually refuses the
//! rename while the image is mapped; when it does, the swap is handed to a
//! batch script that waits for this process to exit.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::{BurrowError, Result};

use super::replace::{ReplaceOutcome, path_with_suffix};

/// Name of the deferred update script written beside the executable.
pub const DEFERRED_SCRIPT_NAME: &str = "update_burrow.bat";

/// Hooks the transactional swap calls at its platform-dependent points.
#[allow(async_fn_in_trait)]
pub trait PlatformStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Where the running executable is moved during the swap.
    fn sibling_path(&self, current: &Path) -> PathBuf;

    /// Called when moving the executable aside failed. Either fail, or hand
    /// the swap off and report a deferred outcome.
    async fn on_move_aside_failed(
        &self,
        current: &Path,
        new: &Path,
        err: io::Error,
    ) -> Result<ReplaceOutcome>;

    /// Final touches on the installed executable. Failures are not fatal.
    async fn finalize(&self, current: &Path) -> io::Result<()>;
}

/// Rename-while-running strategy for Unix-like systems.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixStrategy;

impl PlatformStrategy for PosixStrategy {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn sibling_path(&self, current: &Path) -> PathBuf {
        path_with_suffix(current, &format!(".old.{}", std::process::id()))
    }

    async fn on_move_aside_failed(
        &self,
        current: &Path,
        _new: &Path,
        err: io::Error,
    ) -> Result<ReplaceOutcome> {
        Err(BurrowError::SwapError {
            path: current.display().to_string(),
            reason: format!("could not move the running executable aside: {err}"),
        })
    }

    async fn finalize(&self, current: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(current, std::fs::Permissions::from_mode(0o755)).await?;
        }
        #[cfg(not(unix))]
        let _ = current;
        Ok(())
    }
}

/// Rename-or-defer strategy for Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsStrategy;

impl PlatformStrategy for WindowsStrategy {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn sibling_path(&self, current: &Path) -> PathBuf {
        path_with_suffix(current, ".old")
    }

    async fn on_move_aside_failed(
        &self,
        current: &Path,
        new: &Path,
        err: io::Error,
    ) -> Result<ReplaceOutcome> {
        debug!("Executable is locked ({err}); deferring the swap to a script");
        let script = deferred_script_path(current);
        let script_error = |reason: String| BurrowError::PlatformScriptError {
            script: script.display().to_string(),
            reason,
        };

        let content = deferred_script(std::process::id(), new, current);
        fs::write(&script, content).await.map_err(|e| script_error(format!("write failed: {e}")))?;

        let launched = Command::new("cmd").args(["/C", "start", "", "/B"]).arg(&script).spawn();
        match launched {
            Ok(_) => Ok(ReplaceOutcome::DeferredPendingRestart {
                script,
            }),
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&script).await {
                    warn!("Failed to remove update script {}: {remove_err}", script.display());
                }
                Err(script_error(format!("launch failed: {e}")))
            }
        }
    }

    async fn finalize(&self, _current: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Strategy for the platform this binary was built for.
#[cfg(windows)]
pub type NativeStrategy = WindowsStrategy;

/// Strategy for the platform this binary was built for.
#[cfg(not(windows))]
pub type NativeStrategy = PosixStrategy;

/// Path of the deferred script for `current`.
pub fn deferred_script_path(current: &Path) -> PathBuf {
    current.with_file_name(DEFERRED_SCRIPT_NAME)
}

/// Batch script that finishes the swap after process `pid` exits.
///
/// It waits two seconds, polls `tasklist` once a second until the pid is gone,
/// copies `new` over `current`, deletes `new` and finally deletes itself.
#[must_use]
pub fn deferred_script(pid: u32, new: &Path, current: &Path) -> String {
    let new = new.display();
    let current = current.display();
    [
        "@echo off".to_string(),
        "timeout /t 2 /nobreak > nul".to_string(),
        ":wait".to_string(),
        format!("tasklist /FI \"PID eq {pid}\" 2>nul | find \"{pid}\" >nul"),
        "if not errorlevel 1 (".to_string(),
        "    timeout /t 1 /nobreak > nul".to_string(),
        "    goto wait".to_string(),
        ")".to_string(),
        format!("copy /Y \"{new}\" \"{current}\" > nul"),
        format!("del \"{new}\""),
        "del \"%~f0\"".to_string(),
        String::new(),
    ]
    .join("\r\n")
}
