//! Burrow - a command-line tool that safely installs its own updates
//!
//! The self-update subsystem finds, downloads and installs a newer release of
//! the running binary without ever leaving the user without a working
//! executable.
//!
//! # Core Modules
//!
//! - [`cli`] - `check`, `update` and `config` commands
//! - [`config`] - global configuration (`~/.burrow/config.toml`)
//! - [`core`] - error taxonomy and user-facing error rendering
//! - [`update`] - release resolution, download and the transactional swap
//! - [`utils`] - path validation, the host allow-list and progress reporting
//!
//! # Update Flow
//!
//! ```text
//! ReleaseResolver ──► UpdatePrompt ──► select_asset ──► SecureDownloader ──► ExecutableReplacer
//!   (GitHub API)      (y/n or --yes)    (OS/arch)        (allow-listed)        (backup, swap, rollback)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow::config::UpdateConfig;
//! use burrow::update::{AssumeYes, MemoryVersionStore, UpdateOrchestrator};
//! use burrow::utils::progress::NoProgress;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let orchestrator = UpdateOrchestrator::new(
//!     &UpdateConfig::default(),
//!     AssumeYes,
//!     MemoryVersionStore::default(),
//!     Arc::new(NoProgress),
//! )?;
//! let report = orchestrator.run(&CancellationToken::new()).await?;
//! println!("{report:?}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
