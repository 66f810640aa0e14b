//! `burrow config`: show where configuration lives and what is in effect.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::config::GlobalConfig;

/// Show the configuration file path and effective settings.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Print only the configuration file path
    #[arg(long)]
    pub path: bool,
}

impl ConfigCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let path = match &config.config_path {
            Some(path) => path.clone(),
            None => GlobalConfig::default_path()?,
        };

        if self.path {
            println!("{}", path.display());
            return Ok(());
        }

        let global = config.load_global().await?;
        let rendered = toml::to_string_pretty(&global).context("Failed to render configuration")?;

        let status = if path.exists() {
            ""
        } else {
            " (not present, using defaults)"
        };
        println!("{} {}{}", "Configuration:".bold(), path.display(), status);
        println!();
        print!("{rendered}");
        Ok(())
    }
}
