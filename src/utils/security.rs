//! Host allow-list for outbound requests
//!
//! Release metadata and release assets may only be fetched from a fixed set of
//! GitHub hosts over HTTPS. The check runs before any request is issued.

use reqwest::Url;

use crate::core::{BurrowError, Result};

/// Hosts that serve GitHub release metadata and release assets.
pub static TRUSTED_HOSTS: &[&str] = &[
    "github.com",
    "api.github.com",
    "objects.githubusercontent.com",
    "github-releases.githubusercontent.com",
    "release-assets.githubusercontent.com",
];

/// Loopback hosts admitted in test mode only.
const TEST_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Exact-match host allow-list with an `https` requirement.
///
/// Test mode admits loopback hosts on any port and lifts the scheme check so
/// a local mock server can stand in for GitHub.
#[derive(Debug, Clone)]
pub struct HostAllowList {
    hosts: Vec<String>,
    test_mode: bool,
}

impl Default for HostAllowList {
    fn default() -> Self {
        Self::github()
    }
}

impl HostAllowList {
    /// The production allow-list: [`TRUSTED_HOSTS`], HTTPS only.
    #[must_use]
    pub fn github() -> Self {
        Self {
            hosts: TRUSTED_HOSTS.iter().map(|host| (*host).to_string()).collect(),
            test_mode: false,
        }
    }

    /// Enable or disable test mode.
    #[must_use]
    pub const fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Whether `host` is on the list (exact match).
    #[must_use]
    pub fn is_trusted(&self, host: &str) -> bool {
        self.hosts.iter().any(|allowed| allowed == host)
    }

    /// Validate `url`, returning the parsed form on success.
    pub fn validate(&self, url: &str) -> Result<Url> {
        let reject = |reason: &str| BurrowError::UrlValidation {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(url).map_err(|e| reject(&format!("invalid URL: {e}")))?;
        let host = parsed.host_str().ok_or_else(|| reject("URL has no host"))?;

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(reject("URL must not carry credentials"));
        }

        if self.test_mode && TEST_HOSTS.contains(&host) {
            return Ok(parsed);
        }

        if !self.is_trusted(host) {
            return Err(reject(&format!("host {host} not allowed")));
        }

        if !self.test_mode && parsed.scheme() != "https" {
            return Err(reject("only HTTPS URLs are allowed"));
        }

        Ok(parsed)
    }
}
