//! `burrow check`: report whether a newer release exists.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use super::CliConfig;
use crate::update::{AssumeYes, FileVersionStore, ReleaseCheck, UpdateOrchestrator};
use crate::utils::progress::NoProgress;

/// Check for a newer release without installing anything.
#[derive(Args, Debug)]
pub struct CheckCommand {}

/// Lines printed for `check`.
pub fn check_message(check: &ReleaseCheck) -> Vec<String> {
    if check.update_available {
        vec![
            format!(
                "New version available: {} (current: {})",
                check.release.tag, check.current
            ),
            "Run `burrow update` to update".to_string(),
        ]
    } else {
        vec!["You are running the latest version!".to_string()]
    }
}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let global = config.load_global().await?;
        let orchestrator = UpdateOrchestrator::new(
            &global.update,
            AssumeYes,
            FileVersionStore::default_location()?,
            Arc::new(NoProgress),
        )?;

        let check = orchestrator.check().await?;
        let mut lines = check_message(&check).into_iter();
        if let Some(headline) = lines.next() {
            if check.update_available {
                println!("{}", headline.yellow().bold());
            } else {
                println!("{}", headline.green());
            }
        }
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::Release;

    fn check(tag: &str, available: bool) -> ReleaseCheck {
        ReleaseCheck {
            release: Release {
                tag: tag.to_string(),
                name: None,
                body: None,
                assets: Vec::new(),
            },
            current: "v0.4.0".to_string(),
            update_available: available,
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(check_message(&check("v0.4.0", false)), vec!["You are running the latest version!"]);
        assert_eq!(
            check_message(&check("v0.5.0", true)),
            vec![
                "New version available: v0.5.0 (current: v0.4.0)",
                "Run `burrow update` to update"
            ]
        );
    }
}
