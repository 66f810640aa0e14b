//! Version strings and the "is there an update?" decision.
//!
//! Release tags are dot-separated numeric versions, optionally prefixed with
//! `v`. They are compared segment by segment as integers after zero-padding
//! the shorter one, so `1.2` is older than `1.10` and `1.2` equals `1.2.0`.

use std::cmp::Ordering;

use crate::core::{BurrowError, Result};

/// Version of the running binary, as written in `Cargo.toml`.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The running binary's version in release-tag form (`v0.4.0`).
#[must_use]
pub fn current_tag() -> String {
    format!("v{CURRENT_VERSION}")
}

/// Strip a single leading `v` or `V`.
#[must_use]
pub fn strip_prefix(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn parse_segments(version: &str) -> Result<Vec<u64>> {
    version
        .split('.')
        .map(|segment| segment.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| BurrowError::VersionFormatError {
            version: version.to_string(),
        })
}

/// Compare two dot-separated numeric versions.
///
/// A leading `v` is ignored on both sides. Any non-numeric segment (including
/// an empty one) fails with [`BurrowError::VersionFormatError`].
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    let left = parse_segments(strip_prefix(a))?;
    let right = parse_segments(strip_prefix(b))?;
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

/// Whether `candidate` is strictly newer than `current`.
///
/// # Examples
///
/// ```rust
/// use burrow::update::version::is_version_newer;
///
/// assert!(is_version_newer("1.10", "1.2").unwrap());
/// assert!(!is_version_newer("1.2", "1.10").unwrap());
/// assert!(!is_version_newer("2.0.0", "2.0").unwrap());
/// ```
pub fn is_version_newer(candidate: &str, current: &str) -> Result<bool> {
    Ok(compare_versions(candidate, current)? == Ordering::Greater)
}

/// Decide whether the release tagged `tag` is an update over `current`.
///
/// A tag that differs textually from `current` always counts as an update,
/// which keeps untagged or locally built binaries on the update path. Equal
/// strings still go through the numeric comparison so a malformed marker is
/// reported rather than silently accepted.
pub fn update_available(tag: &str, current: &str) -> Result<bool> {
    if tag != current {
        return Ok(true);
    }
    is_version_newer(strip_prefix(tag), strip_prefix(current))
}

/// Pick the version to compare releases against.
///
/// The stored marker wins (it may record a declined release) unless the
/// running binary is numerically newer, which happens after a manual install.
#[must_use]
pub fn effective_current(stored: Option<&str>, binary: &str) -> String {
    match stored {
        Some(marker) => match is_version_newer(binary, marker) {
            Ok(true) => binary.to_string(),
            _ => marker.to_string(),
        },
        None => binary.to_string(),
    }
}
