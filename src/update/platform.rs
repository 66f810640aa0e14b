//! Platform detection and release asset selection.

use std::fmt;

use tracing::debug;

use crate::core::{BurrowError, Result};

use super::release::{Asset, Release};

/// Prefix shared by every published binary.
const ASSET_PREFIX: &str = "burrow";

/// Operating system and architecture, in the vocabulary used by asset names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    /// `linux`, `darwin`, `windows`, ...
    pub os: String,
    /// `amd64`, `arm64`, `386`, ...
    pub arch: String,
}

impl PlatformInfo {
    /// Build from explicit names, without normalisation.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Normalise Rust target names (`macos`, `x86_64`, ...) to asset names.
    #[must_use]
    pub fn from_target(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Acceptable asset names, most specific first.
    pub fn asset_candidates(&self) -> Result<Vec<String>> {
        let arch = &self.arch;
        let candidates = match self.os.as_str() {
            "windows" => vec![
                format!("{ASSET_PREFIX}-windows-{arch}.exe"),
                format!("{ASSET_PREFIX}-windows.exe"),
            ],
            "darwin" => vec![
                format!("{ASSET_PREFIX}-darwin-{arch}"),
                format!("{ASSET_PREFIX}-macos-{arch}"),
                format!("{ASSET_PREFIX}-darwin-universal"),
                format!("{ASSET_PREFIX}-darwin"),
                format!("{ASSET_PREFIX}-macos"),
            ],
            "linux" => vec![
                format!("{ASSET_PREFIX}-linux-{arch}"),
                format!("{ASSET_PREFIX}-linux"),
            ],
            other => {
                return Err(BurrowError::UnsupportedPlatform {
                    os: other.to_string(),
                });
            }
        };
        Ok(candidates)
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Pick the release asset for `platform`.
///
/// Candidate order decides priority: an arch-specific asset is chosen over a
/// generic one no matter where either appears in the release's asset list.
pub fn select_asset<'a>(release: &'a Release, platform: &PlatformInfo) -> Result<&'a Asset> {
    let candidates = platform.asset_candidates()?;
    candidates
        .iter()
        .find_map(|candidate| release.assets.iter().find(|asset| asset.matches(candidate)))
        .inspect(|asset| debug!("Selected asset {} for {platform}", asset.name))
        .ok_or_else(|| BurrowError::AssetNotFound {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        })
}
