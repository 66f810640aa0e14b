//! Configuration for Burrow
//!
//! Settings are read from `~/.burrow/config.toml` (or `BURROW_CONFIG_PATH`).
//! See [`global`] for the file format.

pub mod global;

pub use global::{CONFIG_PATH_ENV, GlobalConfig, UpdateConfig, burrow_dir};
