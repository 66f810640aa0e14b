//! `burrow update`: download and install the latest release.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::CliConfig;
use super::prompt::TerminalPrompt;
use crate::update::{
    AssumeYes, FileVersionStore, UpdateOrchestrator, UpdatePrompt, UpdateReport, VersionStore,
};
use crate::utils::progress::TerminalProgressSink;

/// Update Burrow to the latest release.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Message shown when an update attempt ends without error.
pub fn report_message(report: &UpdateReport) -> String {
    match report {
        UpdateReport::UpToDate {
            ..
        } => "You are running the latest version!".to_string(),
        UpdateReport::Declined {
            ..
        } => "Update cancelled by user".to_string(),
        UpdateReport::Unanswered {
            tag,
        } => format!("No answer given; run `burrow update --yes` to install {tag}"),
        UpdateReport::Updated {
            from,
            to,
        } => format!("Successfully updated burrow from {from} to {to}"),
        UpdateReport::Deferred {
            to,
            ..
        } => format!("Update to {to} will complete when you restart the application"),
    }
}

fn print_report(report: &UpdateReport) {
    let message = report_message(report);
    match report {
        UpdateReport::UpToDate {
            ..
        }
        | UpdateReport::Updated {
            ..
        } => println!("{}", message.green()),
        UpdateReport::Declined {
            ..
        }
        | UpdateReport::Unanswered {
            ..
        } => println!("{}", message.yellow()),
        UpdateReport::Deferred {
            script,
            ..
        } => {
            println!("{}", message.yellow());
            println!("The update script is at {}", script.display());
        }
    }
}

async fn run<P: UpdatePrompt, S: VersionStore>(
    orchestrator: UpdateOrchestrator<P, S>,
    cancel: &CancellationToken,
) -> Result<UpdateReport> {
    debug!("Updating {}", orchestrator.executable().display());
    Ok(orchestrator.run(cancel).await?)
}

impl UpdateCommand {
    pub async fn execute(self, config: &CliConfig, cancel: &CancellationToken) -> Result<()> {
        let global = config.load_global().await?;
        let store = FileVersionStore::default_location()?;
        let progress = Arc::new(TerminalProgressSink::new(config.show_progress(&global)));

        println!("{}", "Checking for updates...".cyan());
        let report = if self.yes {
            run(UpdateOrchestrator::new(&global.update, AssumeYes, store, progress)?, cancel).await?
        } else {
            run(
                UpdateOrchestrator::new(
                    &global.update,
                    TerminalPrompt::new(cancel.clone()),
                    store,
                    progress,
                )?,
                cancel,
            )
            .await?
        };

        print_report(&report);
        Ok(())
    }
}
