//! Self-update for the Burrow binary.
//!
//! The running executable discovers the latest GitHub release, downloads the
//! asset for its platform and swaps itself for it, restoring the original if
//! anything goes wrong.
//!
//! # Components
//!
//! - [`release::ReleaseResolver`]: fetches release metadata and decides whether it is newer
//! - [`platform::select_asset`]: maps OS/arch to a release asset
//! - [`download::SecureDownloader`]: streams the asset into a validated temp file
//! - [`replace::ExecutableReplacer`]: transactional swap with rollback
//! - [`strategy::PlatformStrategy`]: rename-while-running (POSIX) or deferred script (Windows)
//! - [`orchestrator::UpdateOrchestrator`]: sequences the phases
//!
//! # Trust
//!
//! Trust rests on the host allow-list alone: metadata and assets are only
//! fetched over HTTPS from GitHub hosts. Downloads are not signature-checked.
//!
//! # Files touched
//!
//! ```text
//! <exe>.backup               while the swap runs
//! <exe>.old.<pid>            POSIX, while the swap runs
//! <exe>.old                  Windows, while the swap runs
//! $TMP/<prefix>-<asset>      the download, until installed
//! update_burrow.bat          Windows, only when the executable is locked
//! ```

pub mod backup;
pub mod download;
pub mod orchestrator;
pub mod platform;
pub mod release;
pub mod replace;
pub mod state;
pub mod strategy;
pub mod version;

pub use download::SecureDownloader;
pub use orchestrator::{AssumeYes, Confirmation, UpdateOrchestrator, UpdatePrompt, UpdateReport};
pub use platform::{PlatformInfo, select_asset};
pub use release::{Asset, Release, ReleaseCheck, ReleaseResolver};
pub use replace::{ExecutableReplacer, ReplaceOutcome};
pub use state::{FileVersionStore, MemoryVersionStore, VersionStore};
pub use strategy::{NativeStrategy, PlatformStrategy, PosixStrategy, WindowsStrategy};

use crate::config::UpdateConfig;
use crate::core::{BurrowError, Result};

/// User agent sent with every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = concat!("burrow/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client with the configured timeouts.
pub fn http_client(config: &UpdateConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| BurrowError::NetworkError {
            operation: "build HTTP client".to_string(),
            reason: e.to_string(),
        })
}
