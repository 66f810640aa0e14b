//! Test utilities for Burrow.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite. Only regular dependencies may be used here: the mock
//! server and temp directories are owned by the calling test.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use serde_json::{Value, json};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::UpdateConfig;
use crate::core::Result;
use crate::update::{
    Confirmation, ExecutableReplacer, PlatformInfo, PlatformStrategy, PosixStrategy, Release,
    ReleaseResolver, ReplaceOutcome, SecureDownloader, UpdateOrchestrator, UpdatePrompt,
    VersionStore,
};
use crate::update::strategy::deferred_script_path;
use crate::utils::progress::{NoProgress, ProgressObserver, ProgressSink};
use crate::utils::security::HostAllowList;

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Records every progress notification for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<(u64, u64, u8)>>>,
    finished: Arc<AtomicUsize>,
}

impl RecordingSink {
    /// `(done, total, percent)` triples in arrival order, across all transfers.
    pub fn updates(&self) -> Vec<(u64, u64, u8)> {
        self.updates.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Number of `finish` calls.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl ProgressSink for RecordingSink {
    fn start(&self, _label: &str, _total: u64) -> Box<dyn ProgressObserver> {
        Box::new(self.clone())
    }
}

impl ProgressObserver for RecordingSink {
    fn update(&mut self, done: u64, total: u64, percent: u8) {
        if let Ok(mut guard) = self.updates.lock() {
            guard.push((done, total, percent));
        }
    }

    fn finish(&mut self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Prompt with a canned answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl UpdatePrompt for FixedAnswer {
    async fn confirm(&self, _release: &Release, _current: &str) -> Result<Confirmation> {
        Ok(self.0.into())
    }
}

/// Prompt that nobody answers, like a closed or non-terminal stdin.
#[derive(Debug, Clone, Copy)]
pub struct NoAnswer;

impl UpdatePrompt for NoAnswer {
    async fn confirm(&self, _release: &Release, _current: &str) -> Result<Confirmation> {
        Ok(Confirmation::Unanswered)
    }
}

/// Strategy that always finds the executable locked and defers the swap.
///
/// The sibling path is `<dir>/occupied`; create it as a directory so the
/// rename onto it fails. No script is written or launched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferringStrategy;

impl PlatformStrategy for DeferringStrategy {
    fn name(&self) -> &'static str {
        "deferring"
    }

    fn sibling_path(&self, current: &Path) -> PathBuf {
        current.with_file_name("occupied")
    }

    async fn on_move_aside_failed(
        &self,
        current: &Path,
        _new: &Path,
        _err: io::Error,
    ) -> Result<ReplaceOutcome> {
        Ok(ReplaceOutcome::DeferredPendingRestart {
            script: deferred_script_path(current),
        })
    }

    async fn finalize(&self, _current: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// GitHub `releases/latest` payload with the given `(name, url)` assets.
pub fn release_json(tag: &str, assets: &[(&str, &str)]) -> Value {
    let assets: Vec<Value> = assets
        .iter()
        .map(|(name, url)| json!({ "name": name, "browser_download_url": url, "size": 0 }))
        .collect();
    json!({
        "tag_name": tag,
        "name": format!("Burrow {tag}"),
        "body": "Bug fixes and improvements",
        "draft": false,
        "prerelease": false,
        "assets": assets,
    })
}

/// Default update settings pointed at `api_base_url`.
pub fn test_update_config(api_base_url: &str) -> UpdateConfig {
    UpdateConfig {
        api_base_url: api_base_url.to_string(),
        ..UpdateConfig::default()
    }
}

/// Orchestrator against a mock API at `api_base_url`, replacing `dir/burrow`.
///
/// `dir/burrow` is created with the contents `old binary`, downloads land in
/// `dir`, loopback hosts are allowed and assets are chosen for linux/amd64.
pub async fn test_orchestrator<P: UpdatePrompt, S: VersionStore>(
    api_base_url: &str,
    dir: &Path,
    prompt: P,
    store: S,
) -> UpdateOrchestrator<P, S, PosixStrategy> {
    test_orchestrator_with(api_base_url, dir, prompt, store, PosixStrategy).await
}

/// [`test_orchestrator`] with an explicit swap strategy.
pub async fn test_orchestrator_with<P: UpdatePrompt, S: VersionStore, T: PlatformStrategy>(
    api_base_url: &str,
    dir: &Path,
    prompt: P,
    store: S,
    strategy: T,
) -> UpdateOrchestrator<P, S, T> {
    let executable = dir.join("burrow");
    if let Err(e) = tokio::fs::write(&executable, b"old binary").await {
        panic!("failed to create test executable: {e}");
    }

    let config = test_update_config(api_base_url);
    let allow_list = HostAllowList::github().with_test_mode(true);
    let progress: Arc<dyn ProgressSink> = Arc::new(NoProgress);
    let client = reqwest::Client::new();

    UpdateOrchestrator::from_parts(
        ReleaseResolver::new(client.clone(), &config, allow_list.clone()),
        SecureDownloader::new(client, allow_list, config.temp_prefix.clone(), progress.clone())
            .with_temp_dir(dir),
        ExecutableReplacer::new(strategy, progress),
        prompt,
        store,
        executable,
    )
    .with_platform(PlatformInfo::new("linux", "amd64"))
}
