//! Burrow command-line entry point.

use anyhow::Result;
use burrow::cli::Cli;
use burrow::core::user_friendly_error;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status when the executable may have been left broken.
const EXIT_CRITICAL: i32 = 2;

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.build_config().log_level);

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.execute(cancel).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(if error_ctx.critical {
                EXIT_CRITICAL
            } else {
                1
            });
        }
    }
}
