//! Error formatting utilities for Burrow
//!
//! Converts errors coming out of commands into clear, actionable messages.

use super::error::{BurrowError, ErrorContext, UpdateError};

/// Keywords that indicate network-related errors
const NETWORK_ERROR_KEYWORDS: &[&str] = &["network", "connection", "timeout", "timed out"];

/// Keywords that indicate permission-related errors
const PERMISSION_ERROR_KEYWORDS: &[&str] = &["permission", "denied", "access"];

/// Convert any error into a user-friendly format with contextual suggestions
///
/// The chain is walked looking for an [`UpdateError`] (which names the failing
/// phase) or a bare [`BurrowError`]. Anything else falls back to keyword
/// matching on the top-level message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut current_error: &dyn std::error::Error = error.as_ref();
    loop {
        if let Some(update_error) = current_error.downcast_ref::<UpdateError>() {
            let ctx = create_error_context(update_error.kind());
            let phase = format!("The update stopped during the {} phase", update_error.phase);
            let details = match ctx.details {
                Some(ref details) => format!("{phase}. {details}"),
                None => phase,
            };
            return ErrorContext {
                details: Some(details),
                ..ctx
            };
        }

        if let Some(burrow_error) = current_error.downcast_ref::<BurrowError>() {
            return create_error_context(burrow_error);
        }

        match current_error.source() {
            Some(source) => current_error = source,
            None => break,
        }
    }

    let error_msg = format!("{error:#}");

    if NETWORK_ERROR_KEYWORDS.iter().any(|&keyword| error_msg.contains(keyword)) {
        return ErrorContext::new(error_msg)
            .with_suggestion("Check your internet connection and try again");
    }

    if PERMISSION_ERROR_KEYWORDS.iter().any(|&keyword| error_msg.contains(keyword)) {
        return ErrorContext::new(error_msg)
            .with_suggestion("Check file permissions and try running with appropriate privileges");
    }

    ErrorContext::new(error_msg)
}

/// Create a user-friendly error context from a [`BurrowError`]
pub fn create_error_context(error: &BurrowError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string());
    match error {
        BurrowError::NetworkError {
            ..
        }
        | BurrowError::Timeout {
            ..
        } => ctx
            .with_suggestion("Check your internet connection and run `burrow update` again")
            .with_details("No changes were made to the installed executable"),
        BurrowError::ProtocolError {
            ..
        }
        | BurrowError::HttpStatus {
            ..
        } => ctx
            .with_suggestion("Try again later; GitHub may be rate limiting or unavailable")
            .with_details("The release server returned a response Burrow could not use"),
        BurrowError::VersionFormatError {
            ..
        } => ctx.with_details("Release versions must be dot-separated numbers such as 1.4.2"),
        BurrowError::UnsupportedPlatform {
            ..
        } => ctx
            .with_suggestion("Build Burrow from source for this platform")
            .with_details("Prebuilt releases exist for Linux, macOS and Windows only"),
        BurrowError::AssetNotFound {
            ..
        } => ctx
            .with_suggestion("Download the binary manually from the releases page")
            .with_details("The latest release does not publish a binary for this platform"),
        BurrowError::UrlValidation {
            ..
        } => ctx.with_details("Burrow only downloads from trusted GitHub hosts over HTTPS"),
        BurrowError::PathValidation {
            ..
        } => ctx.with_details("Paths containing '..' or other unsafe components are refused"),
        BurrowError::FileSystemError {
            source,
            ..
        } if source.kind() == std::io::ErrorKind::PermissionDenied => ctx
            .with_suggestion(
                "Re-run with permission to write the install directory (for example with sudo)",
            ),
        BurrowError::FileSystemError {
            ..
        }
        | BurrowError::IoError(_) => {
            ctx.with_suggestion("Check that the path exists and that there is enough disk space")
        }
        BurrowError::BackupError {
            ..
        } => ctx
            .with_suggestion("Make sure the directory containing burrow is writable")
            .with_details("Nothing was replaced; the current executable is unchanged"),
        BurrowError::SwapError {
            ..
        } => ctx
            .with_suggestion("Run `burrow update` again")
            .with_details("The original executable was restored"),
        BurrowError::RestoreError {
            backup,
            ..
        } => ctx
            .with_suggestion(format!("Copy '{backup}' back over the executable by hand"))
            .with_details("The original executable could not be put back and may be missing")
            .critical(),
        BurrowError::PlatformScriptError {
            ..
        } => ctx
            .with_suggestion("Close all running copies of burrow and run `burrow update` again"),
        BurrowError::Cancelled {
            ..
        } => ctx.with_details("Temporary files were removed; nothing was changed"),
        BurrowError::ConfigError {
            ..
        } => ctx.with_suggestion("Fix or delete ~/.burrow/config.toml"),
    }
}
