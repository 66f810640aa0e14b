//! Path validation and security utilities for Burrow.
//!
//! Every component of the updater that touches the filesystem runs its paths
//! through [`validate_file_path`] first, and temporary download paths are built
//! with [`safe_temp_path`] so that a hostile asset name cannot escape the temp
//! directory.

use std::path::{Component, Path, PathBuf};

use crate::core::{BurrowError, Result};

/// Validate that a path is safe to read or write.
///
/// Rejected:
/// - empty paths
/// - paths containing a NUL byte
/// - paths with a `..` component anywhere, before any normalisation
///
/// # Examples
///
/// ```rust
/// use burrow::utils::path_validation::validate_file_path;
/// use std::path::Path;
///
/// assert!(validate_file_path(Path::new("/usr/local/bin/burrow")).is_ok());
/// assert!(validate_file_path(Path::new("/tmp/../etc/passwd")).is_err());
/// ```
pub fn validate_file_path(path: &Path) -> Result<()> {
    let raw = path.as_os_str();
    if raw.is_empty() {
        return Err(rejected(path, "path is empty"));
    }

    if raw.to_string_lossy().contains('\0') {
        return Err(rejected(path, "path contains a NUL byte"));
    }

    validate_no_traversal(path)
}

/// Reject any parent directory reference in `path`.
pub fn validate_no_traversal(path: &Path) -> Result<()> {
    if path.components().any(|component| matches!(component, Component::ParentDir)) {
        return Err(rejected(path, "path contains directory traversal (..)"));
    }
    Ok(())
}

/// Build a validated temp file path for a downloaded asset.
///
/// Any directory components in `filename` are dropped (both `/` and `\` count
/// as separators, whatever the host platform), then the remaining name is
/// joined under `temp_dir` as `<prefix>-<name>` and validated again.
pub fn safe_temp_path(temp_dir: &Path, prefix: &str, filename: &str) -> Result<PathBuf> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        return Err(BurrowError::PathValidation {
            path: filename.to_string(),
            reason: "invalid file name".to_string(),
        });
    }

    let temp_file = temp_dir.join(format!("{prefix}-{base}"));
    validate_file_path(&temp_file)?;
    Ok(temp_file)
}

fn rejected(path: &Path, reason: &str) -> BurrowError {
    BurrowError::PathValidation {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
