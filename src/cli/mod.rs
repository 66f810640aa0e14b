//! Command-line interface for Burrow.
//!
//! ```bash
//! burrow check            # is there a newer release?
//! burrow update           # download and install it, asking first
//! burrow update --yes     # ... without asking
//! burrow config           # show the effective configuration
//! ```
//!
//! Global flags: `--verbose` (debug logging), `--quiet` (errors only),
//! `--no-progress` (hide progress bars) and `--config <PATH>`.

mod check;
mod config;
pub mod prompt;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::GlobalConfig;

/// Settings derived from the global flags, handed to every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter (`RUST_LOG` still wins).
    pub log_level: String,
    /// Hide progress bars regardless of configuration.
    pub no_progress: bool,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load the global configuration, honouring `--config`.
    pub async fn load_global(&self) -> Result<GlobalConfig> {
        match &self.config_path {
            Some(path) => GlobalConfig::load_or_default(path).await,
            None => GlobalConfig::load().await,
        }
    }

    /// Whether progress bars should be drawn for `config`.
    #[must_use]
    pub const fn show_progress(&self, config: &GlobalConfig) -> bool {
        config.update.show_progress && !self.no_progress
    }
}

/// Burrow command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "burrow",
    about = "Check for and install Burrow updates",
    version,
    author,
    long_about = "Burrow checks GitHub for newer releases of itself and installs them, restoring the previous executable if anything goes wrong."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternate configuration file
    #[arg(short, long, global = true, env = "BURROW_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a newer release is available
    Check(check::CheckCommand),

    /// Download and install the latest release
    Update(update::UpdateCommand),

    /// Show the configuration file location and effective settings
    Config(config::ConfigCommand),
}

impl Cli {
    /// Global flags resolved into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command.
    pub async fn execute(self, cancel: CancellationToken) -> Result<()> {
        let config = self.build_config();
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Update(cmd) => cmd.execute(&config, &cancel).await,
            Commands::Config(cmd) => cmd.execute(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        let cli = Cli::try_parse_from(["burrow", "check"]).unwrap();
        assert_eq!(cli.build_config().log_level, "warn");

        let cli = Cli::try_parse_from(["burrow", "-v", "check"]).unwrap();
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::try_parse_from(["burrow", "update", "--quiet"]).unwrap();
        assert_eq!(cli.build_config().log_level, "error");
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["burrow", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn test_update_flags() {
        let cli = Cli::try_parse_from(["burrow", "update", "--yes", "--no-progress"]).unwrap();
        let config = cli.build_config();
        assert!(config.no_progress);
        assert!(matches!(cli.command, Commands::Update(ref cmd) if cmd.yes));
    }

    #[test]
    fn test_show_progress() {
        let mut global = GlobalConfig::default();
        let config = CliConfig::default();
        assert!(config.show_progress(&global));

        global.update.show_progress = false;
        assert!(!config.show_progress(&global));

        let config = CliConfig {
            no_progress: true,
            ..CliConfig::default()
        };
        assert!(!config.show_progress(&GlobalConfig::default()));
    }
}
