//! Streaming download of release assets to a validated temp file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::StatusCode;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{BurrowError, Result};
use crate::utils::path_validation::safe_temp_path;
use crate::utils::progress::{ProgressReader, ProgressSink};
use crate::utils::security::HostAllowList;

/// Downloads assets from allow-listed hosts into the temp directory.
///
/// The returned path is owned by the caller, who must delete it once the file
/// has been consumed. On failure nothing is left behind.
pub struct SecureDownloader {
    client: reqwest::Client,
    allow_list: HostAllowList,
    temp_dir: PathBuf,
    temp_prefix: String,
    progress: Arc<dyn ProgressSink>,
}

impl SecureDownloader {
    /// Create a downloader writing into the system temp directory.
    pub fn new(
        client: reqwest::Client,
        allow_list: HostAllowList,
        temp_prefix: impl Into<String>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            client,
            allow_list,
            temp_dir: std::env::temp_dir(),
            temp_prefix: temp_prefix.into(),
            progress,
        }
    }

    /// Write downloads into `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Download `url` to `<temp_dir>/<prefix>-<basename of filename>`.
    pub async fn download(
        &self,
        url: &str,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let parsed = self.allow_list.validate(url)?;
        let temp_path = safe_temp_path(&self.temp_dir, &self.temp_prefix, filename)?;

        info!("Downloading {url}");
        let response = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                return Err(BurrowError::Cancelled {
                    operation: "download".to_string(),
                });
            }
            result = self.client.get(parsed).send() => {
                result.map_err(|e| BurrowError::from_reqwest("download", &e))?
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BurrowError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let stream = response.bytes_stream().map_err(io::Error::other);
        let body = StreamReader::new(stream);
        let reader: Box<dyn AsyncRead + Unpin + Send> = match total {
            Some(len) if len > 0 => {
                Box::new(ProgressReader::new(body, len, self.progress.start("Downloading", len)))
            }
            _ => Box::new(body),
        };

        let file = create_exclusive(&temp_path).await?;
        match write_to(reader, file, &temp_path, cancel).await {
            Ok(bytes) => {
                debug!("Downloaded {bytes} bytes to {}", temp_path.display());
                Ok(temp_path)
            }
            Err(e) => {
                discard_partial(&temp_path).await;
                Err(e)
            }
        }
    }
}

/// Open `path` as a fresh file only this process created.
///
/// Whatever already sits at the path is unlinked first (a symlink itself, never
/// its target), and the open fails if anything reappears before it.
async fn create_exclusive(path: &Path) -> Result<fs::File> {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed stale entry at {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(BurrowError::fs("remove stale", path, e)),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await.map_err(|e| BurrowError::fs("create", path, e))
}

async fn write_to(
    mut reader: Box<dyn AsyncRead + Unpin + Send>,
    mut file: fs::File,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64> {
    let copied = tokio::select! {
        biased;

        () = cancel.cancelled() => {
            return Err(BurrowError::Cancelled {
                operation: "download".to_string(),
            });
        }
        result = tokio::io::copy(&mut reader, &mut file) => result,
    };
    let bytes = copied.map_err(|e| classify_stream_error(path, e))?;

    file.flush().await.map_err(|e| BurrowError::fs("flush", path, e))?;
    Ok(bytes)
}

/// Body errors arrive wrapped in `io::Error`; unwrap them back into network errors.
fn classify_stream_error(path: &Path, err: io::Error) -> BurrowError {
    match err.get_ref().and_then(|inner| inner.downcast_ref::<reqwest::Error>()) {
        Some(http) => BurrowError::from_reqwest("download", http),
        None => BurrowError::fs("write", path, err),
    }
}

async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial download {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {e}", path.display()),
    }
}
