//! GitHub release metadata and the update decision.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::UpdateConfig;
use crate::core::{BurrowError, Result};
use crate::utils::security::HostAllowList;

use super::version::update_available;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name as published.
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

impl Asset {
    /// Case-insensitive name match.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A published release, decoded from the `releases/latest` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version tag, possibly `v`-prefixed.
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Changelog text.
    #[serde(default)]
    pub body: Option<String>,
    /// Attached files, in published order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// Outcome of [`ReleaseResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ReleaseCheck {
    /// The latest release.
    pub release: Release,
    /// The version it was compared against.
    pub current: String,
    /// Whether the release counts as an update.
    pub update_available: bool,
}

/// Fetches the latest release and decides whether it is newer.
pub struct ReleaseResolver {
    client: reqwest::Client,
    url: String,
    allow_list: HostAllowList,
}

impl ReleaseResolver {
    /// Build a resolver for the repository named in `config`.
    pub fn new(client: reqwest::Client, config: &UpdateConfig, allow_list: HostAllowList) -> Self {
        Self {
            client,
            url: config.latest_release_url(),
            allow_list,
        }
    }

    /// Fetch the latest release metadata.
    pub async fn fetch_latest(&self) -> Result<Release> {
        let url = self.allow_list.validate(&self.url)?;
        debug!("Fetching release metadata from {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| BurrowError::from_reqwest("fetch latest release", &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BurrowError::ProtocolError {
                url: self.url.clone(),
                reason: format!("HTTP {status}"),
            });
        }

        response.json::<Release>().await.map_err(|e| {
            if e.is_decode() {
                BurrowError::ProtocolError {
                    url: self.url.clone(),
                    reason: format!("could not decode release metadata: {e}"),
                }
            } else {
                BurrowError::from_reqwest("read release metadata", &e)
            }
        })
    }

    /// Fetch the latest release and compare it against `current`.
    pub async fn resolve(&self, current: &str) -> Result<ReleaseCheck> {
        let release = self.fetch_latest().await?;
        let update_available = update_available(&release.tag, current)?;
        info!(
            "Latest release is {} (current: {current}, update available: {update_available})",
            release.tag
        );
        Ok(ReleaseCheck {
            release,
            current: current.to_string(),
            update_available,
        })
    }
}
