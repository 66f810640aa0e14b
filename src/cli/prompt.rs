//! Interactive update confirmation on the terminal.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::core::{BurrowError, Result};
use crate::update::{Confirmation, Release, UpdatePrompt};

/// Asks "Do you want to update? (y/n)" on stdin.
///
/// When stdin is not a terminal nothing is read and the question goes
/// unanswered, so scripts and CI never block and nothing is recorded.
/// Cancelling the token abandons the question.
#[derive(Debug, Default, Clone)]
pub struct TerminalPrompt {
    cancel: CancellationToken,
}

impl TerminalPrompt {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
        }
    }
}

/// Empty input, `y` and `yes` mean yes.
#[must_use]
pub fn parse_answer(input: &str) -> bool {
    let answer = input.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

/// Read one answer line from `reader`. EOF leaves the question unanswered.
pub async fn read_answer<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Confirmation> {
    let mut response = String::new();
    if reader.read_line(&mut response).await? == 0 {
        return Ok(Confirmation::Unanswered);
    }
    Ok(parse_answer(&response).into())
}

fn print_release(release: &Release, current: &str) {
    println!("{}", "Update Available".green().bold());
    println!("  Current version: {}", current.yellow());
    println!("  Latest version:  {}", release.tag.green());

    if let Some(body) = release.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        println!();
        println!("{}", "Release notes:".bold());
        for line in body.lines() {
            println!("  {line}");
        }
    }
    println!();
}

impl UpdatePrompt for TerminalPrompt {
    async fn confirm(&self, release: &Release, current: &str) -> Result<Confirmation> {
        print_release(release, current);

        if !io::stdin().is_terminal() {
            eprintln!(
                "{}",
                "Not running interactively; skipping the update. Use `burrow update --yes` to install."
                    .yellow()
            );
            return Ok(Confirmation::Unanswered);
        }

        print!("Do you want to update? (y/n): ");
        io::stdout().flush()?;

        let mut reader = BufReader::new(tokio::io::stdin());
        tokio::select! {
            () = self.cancel.cancelled() => Err(BurrowError::Cancelled {
                operation: "confirmation prompt".to_string(),
            }),
            answer = read_answer(&mut reader) => answer,
        }
    }
}
