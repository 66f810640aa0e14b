//! Error handling for Burrow
//!
//! The self-update subsystem fails in many distinct ways, and the caller needs to
//! tell them apart: a network hiccup is worth retrying, an unsupported platform is
//! not, and a failed restore means the executable on disk may be broken.
//!
//! # Architecture
//!
//! - [`BurrowError`] - one variant per failure class of the update pipeline
//! - [`UpdatePhase`] / [`UpdateError`] - the orchestrator's wrapper naming the
//!   phase that failed while keeping the inner error untouched
//! - [`ErrorContext`] - user-facing rendering with details and a suggestion
//!
//! Use [`user_friendly_error`](crate::core::user_friendly_error) to turn any
//! `anyhow::Error` coming out of a command into an [`ErrorContext`].
//!
//! # Severity
//!
//! [`BurrowError::RestoreError`] is the only critical error: it is raised when the
//! original executable could not be put back after a failed swap. It is rendered
//! under its own heading and the process exits with a distinct status code.

use colored::Colorize;
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

/// The main error type for Burrow operations
///
/// Every variant carries the path, URL or reason needed to explain the failure
/// without the caller having to reconstruct it.
#[derive(Error, Debug)]
pub enum BurrowError {
    /// Transport-level failure (DNS, connect, TLS, reset)
    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        /// The network operation that failed
        operation: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// The release endpoint answered, but not with something usable
    #[error("Unexpected response from {url}: {reason}")]
    ProtocolError {
        /// URL that produced the response
        url: String,
        /// Why the response was rejected (status line or decode error)
        reason: String,
    },

    /// A version string contained a non-numeric segment
    #[error("Invalid version format: '{version}'")]
    VersionFormatError {
        /// The offending version string
        version: String,
    },

    /// No asset naming scheme is known for this operating system
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform {
        /// Operating system name as used in asset names
        os: String,
    },

    /// The release has no asset matching any candidate name
    #[error("No compatible asset found for {os}/{arch}")]
    AssetNotFound {
        /// Operating system name
        os: String,
        /// Architecture name
        arch: String,
    },

    /// URL rejected by the host allow-list or scheme policy
    #[error("URL validation failed for '{url}': {reason}")]
    UrlValidation {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Path rejected by the traversal checks
    #[error("Path validation failed for '{path}': {reason}")]
    PathValidation {
        /// The rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Download answered with a status other than 200
    #[error("Download from {url} failed with HTTP status {status}")]
    HttpStatus {
        /// URL that was requested
        url: String,
        /// HTTP status code received
        status: u16,
    },

    /// Generic file system failure
    #[error("File system error: failed to {operation} '{path}': {source}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path the operation was applied to
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The backup of the current executable could not be created
    #[error("Failed to back up '{path}': {reason}")]
    BackupError {
        /// Executable that was being backed up
        path: String,
        /// Why the backup failed
        reason: String,
    },

    /// The new executable could not be put in place; the original was restored
    #[error("Failed to replace '{path}': {reason}")]
    SwapError {
        /// Executable that was being replaced
        path: String,
        /// Why the swap failed
        reason: String,
    },

    /// The original executable could not be restored after a failed swap
    #[error("Failed to restore '{path}' after a failed update: {reason}")]
    RestoreError {
        /// Executable that could not be restored
        path: String,
        /// Backup copy that still holds the original contents
        backup: String,
        /// Why the restore failed
        reason: String,
    },

    /// The deferred update script could not be written or launched
    #[error("Failed to set up deferred update script '{script}': {reason}")]
    PlatformScriptError {
        /// Path of the script
        script: String,
        /// Why it failed
        reason: String,
    },

    /// The operation was cancelled before it completed
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that was cancelled
        operation: String,
    },

    /// A network operation exceeded its configured deadline
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What went wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl BurrowError {
    /// Build a [`BurrowError::FileSystemError`] for `operation` on `path`.
    pub fn fs(operation: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self::FileSystemError {
            operation: operation.into(),
            path: path.display().to_string(),
            source,
        }
    }

    /// Classify a `reqwest` failure for `operation`.
    pub fn from_reqwest(operation: impl Into<String>, err: &reqwest::Error) -> Self {
        let operation = operation.into();
        if err.is_timeout() {
            Self::Timeout {
                operation,
            }
        } else {
            Self::NetworkError {
                operation,
                reason: err.to_string(),
            }
        }
    }

    /// Whether the error means the executable on disk may be missing or corrupted.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::RestoreError { .. })
    }
}

/// Phases of an update attempt, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Fetching release metadata and deciding whether it is newer
    Resolve,
    /// Asking the user for confirmation
    Confirm,
    /// Mapping the platform to a release asset
    SelectAsset,
    /// Downloading the asset to a temp file
    Download,
    /// Swapping the running executable
    Replace,
    /// Recording the new version marker
    Persist,
}

impl UpdatePhase {
    /// Short lowercase name used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Confirm => "confirm",
            Self::SelectAsset => "select-asset",
            Self::Download => "download",
            Self::Replace => "replace",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the update orchestrator: the failing phase plus the
/// unchanged error that phase produced.
#[derive(Error, Debug)]
#[error("Update failed during {phase}: {source}")]
pub struct UpdateError {
    /// Phase that failed
    pub phase: UpdatePhase,
    /// Error raised by that phase
    #[source]
    pub source: BurrowError,
}

impl UpdateError {
    /// Wrap `source` as a failure of `phase`.
    #[must_use]
    pub const fn new(phase: UpdatePhase, source: BurrowError) -> Self {
        Self {
            phase,
            source,
        }
    }

    /// The inner error, unmodified in kind.
    #[must_use]
    pub const fn kind(&self) -> &BurrowError {
        &self.source
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show the main message in red, optional details in
/// yellow and an optional suggestion in green. Critical errors get a separate
/// heading so they cannot be mistaken for an ordinary failed update.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
    /// Whether the executable may have been left broken
    pub critical: bool,
}

impl ErrorContext {
    /// Create a new error context from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
            critical: false,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark the error as critical.
    #[must_use]
    pub const fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        if self.critical {
            eprintln!(
                "{}",
                "CRITICAL: the executable could not be restored".red().bold().underline()
            );
        }
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.critical {
            write!(f, "CRITICAL: ")?;
        }
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}
