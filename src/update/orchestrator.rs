//! Sequencing of a complete update attempt.
//!
//! resolve → confirm → select asset → download → replace → persist
//!
//! Each phase fails fast. Errors come back as [`UpdateError`], which names the
//! phase and carries the phase's own [`BurrowError`] unchanged. Nothing is
//! retried here; callers re-run the whole flow.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::core::{BurrowError, Result, UpdateError, UpdatePhase};
use crate::utils::progress::ProgressSink;
use crate::utils::security::HostAllowList;

use super::download::SecureDownloader;
use super::platform::{PlatformInfo, select_asset};
use super::release::{Release, ReleaseCheck, ReleaseResolver};
use super::replace::{ExecutableReplacer, ReplaceOutcome};
use super::state::VersionStore;
use super::strategy::{NativeStrategy, PlatformStrategy};
use super::version::{current_tag, effective_current};
use super::http_client;

/// Answer to "Do you want to update?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Go ahead.
    Accepted,
    /// The user said no; the release is remembered as declined.
    Declined,
    /// Nobody answered (no terminal, or input closed). Nothing is recorded.
    Unanswered,
}

impl From<bool> for Confirmation {
    fn from(yes: bool) -> Self {
        if yes {
            Self::Accepted
        } else {
            Self::Declined
        }
    }
}

/// Asks the user whether to install a release.
#[allow(async_fn_in_trait)]
pub trait UpdatePrompt {
    /// Ask about `release`, which would replace `current`.
    async fn confirm(&self, release: &Release, current: &str) -> Result<Confirmation>;
}

/// Answers yes without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl UpdatePrompt for AssumeYes {
    async fn confirm(&self, _release: &Release, _current: &str) -> Result<Confirmation> {
        Ok(Confirmation::Accepted)
    }
}

/// How an update attempt ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReport {
    /// The latest release is not newer.
    UpToDate {
        /// Version compared against.
        current: String,
    },
    /// The user said no; `tag` will not be offered again.
    Declined {
        /// The declined release.
        tag: String,
    },
    /// Nobody answered the prompt; `tag` will be offered again.
    Unanswered {
        /// The release that was offered.
        tag: String,
    },
    /// The new executable is installed.
    Updated {
        /// Previous version.
        from: String,
        /// Installed version.
        to: String,
    },
    /// The swap finishes when this process exits.
    Deferred {
        /// Version being installed.
        to: String,
        /// Script that completes the swap.
        script: PathBuf,
    },
}

fn in_phase(phase: UpdatePhase) -> impl FnOnce(BurrowError) -> UpdateError {
    move |source| UpdateError::new(phase, source)
}

/// Runs resolve → confirm → download → replace for one executable.
pub struct UpdateOrchestrator<P, S, T = NativeStrategy> {
    resolver: ReleaseResolver,
    downloader: SecureDownloader,
    replacer: ExecutableReplacer<T>,
    prompt: P,
    store: S,
    executable: PathBuf,
    platform: PlatformInfo,
    binary_version: String,
}

impl<P: UpdatePrompt, S: VersionStore> UpdateOrchestrator<P, S> {
    /// Wire up an orchestrator for the running executable.
    pub fn new(
        config: &UpdateConfig,
        prompt: P,
        store: S,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self> {
        let client = http_client(config)?;
        let allow_list = HostAllowList::github();
        let resolver = ReleaseResolver::new(client.clone(), config, allow_list.clone());
        let downloader =
            SecureDownloader::new(client, allow_list, config.temp_prefix.clone(), progress.clone());
        let replacer = ExecutableReplacer::new(NativeStrategy::default(), progress);

        let exe = std::env::current_exe()
            .map_err(|e| BurrowError::fs("locate", Path::new("<current executable>"), e))?;
        let executable = std::fs::canonicalize(&exe).unwrap_or(exe);

        Ok(Self::from_parts(resolver, downloader, replacer, prompt, store, executable))
    }
}

impl<P: UpdatePrompt, S: VersionStore, T: PlatformStrategy> UpdateOrchestrator<P, S, T> {
    /// Assemble from explicit components.
    pub fn from_parts(
        resolver: ReleaseResolver,
        downloader: SecureDownloader,
        replacer: ExecutableReplacer<T>,
        prompt: P,
        store: S,
        executable: PathBuf,
    ) -> Self {
        Self {
            resolver,
            downloader,
            replacer,
            prompt,
            store,
            executable,
            platform: PlatformInfo::current(),
            binary_version: current_tag(),
        }
    }

    /// Select assets for `platform` instead of the build platform.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    /// Treat the running binary as `version` (tag form).
    #[must_use]
    pub fn with_binary_version(mut self, version: impl Into<String>) -> Self {
        self.binary_version = version.into();
        self
    }

    /// The executable this orchestrator replaces.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Version releases are compared against.
    pub async fn current_version(&self) -> String {
        effective_current(self.store.load().await.as_deref(), &self.binary_version)
    }

    /// Resolve only: fetch the latest release and compare.
    pub async fn check(&self) -> std::result::Result<ReleaseCheck, UpdateError> {
        let current = self.current_version().await;
        self.resolver.resolve(&current).await.map_err(in_phase(UpdatePhase::Resolve))
    }

    /// Run a full update attempt.
    pub async fn run(&self, cancel: &CancellationToken) -> std::result::Result<UpdateReport, UpdateError> {
        let check = self.check().await?;
        let tag = check.release.tag.clone();
        if !check.update_available {
            return Ok(UpdateReport::UpToDate {
                current: check.current,
            });
        }

        let answer = self
            .prompt
            .confirm(&check.release, &check.current)
            .await
            .map_err(in_phase(UpdatePhase::Confirm))?;
        match answer {
            Confirmation::Accepted => {}
            Confirmation::Declined => {
                info!("Update to {tag} declined");
                self.store.save(&tag).await.map_err(in_phase(UpdatePhase::Persist))?;
                return Ok(UpdateReport::Declined {
                    tag,
                });
            }
            Confirmation::Unanswered => {
                info!("No answer for the update to {tag}; leaving it pending");
                return Ok(UpdateReport::Unanswered {
                    tag,
                });
            }
        }

        let asset =
            select_asset(&check.release, &self.platform).map_err(in_phase(UpdatePhase::SelectAsset))?;
        let downloaded = self
            .downloader
            .download(&asset.download_url, &asset.name, cancel)
            .await
            .map_err(in_phase(UpdatePhase::Download))?;

        let outcome = match self.replacer.replace(&self.executable, &downloaded, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                remove_download(&downloaded).await;
                return Err(UpdateError::new(UpdatePhase::Replace, e));
            }
        };

        let report = match outcome {
            ReplaceOutcome::Completed => {
                remove_download(&downloaded).await;
                UpdateReport::Updated {
                    from: check.current,
                    to: tag.clone(),
                }
            }
            ReplaceOutcome::DeferredPendingRestart {
                script,
            } => {
                debug!("Leaving {} for {}", downloaded.display(), script.display());
                UpdateReport::Deferred {
                    to: tag.clone(),
                    script,
                }
            }
        };

        if let Err(e) = self.store.save(&tag).await {
            warn!("Update succeeded but the version marker could not be saved: {e}");
        }
        Ok(report)
    }
}

async fn remove_download(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("Failed to remove downloaded file {}: {e}", path.display());
    }
}
