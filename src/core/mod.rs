//! Core types shared across Burrow
//!
//! - [`error`]: the [`BurrowError`] taxonomy, [`UpdateError`] and [`ErrorContext`]
//! - [`error_formatting`]: turning errors into user-facing messages

pub mod error;
pub mod error_formatting;

pub use error::{BurrowError, ErrorContext, UpdateError, UpdatePhase};
pub use error_formatting::{create_error_context, user_friendly_error};

/// Result alias for operations that fail with a [`BurrowError`].
pub type Result<T, E = BurrowError> = std::result::Result<T, E>;
