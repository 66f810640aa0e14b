//! Trust boundaries and terminal helpers
//!
//! # Modules
//!
//! - [`path_validation`] - rejects traversal and unsafe paths, builds temp paths
//! - [`security`] - host allow-list applied to every outbound URL
//! - [`progress`] - progress-reporting reader decorator and terminal bars

pub mod path_validation;
pub mod progress;
pub mod security;

pub use path_validation::{safe_temp_path, validate_file_path};
pub use progress::{NoProgress, ProgressObserver, ProgressReader, ProgressSink, TerminalProgressSink};
pub use security::HostAllowList;
