//! Backstop CLI
//!
//! Drives Tableau Server backups and reports how they went.
//!
//! Two ways to run a backup:
//! - `maintenance`: run `tsm maintenance backup` on this node and stream
//!   its output into the log
//! - `start --wait`: start the backup through the TSM API and follow the
//!   job until it finishes
//!
//! Either way the run ends with one outcome code, used as the exit status
//! and sent to Zabbix when configured.

mod commands;
mod logging;
mod monitor;

use anyhow::{Context, Result};
use backstop_core::config::Config;
use backstop_core::outcome::Outcome;
use clap::Parser;
use commands::{Commands, handle_command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "backstop")]
#[command(about = "Tableau Server backup driver", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "BACKSTOP_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Error while loading {}", cli.config.display()))?;

    let _guard = logging::init(cli.debug, config.logging.as_ref())?;
    debug!("{} was loaded", cli.config.display());

    let outcome = handle_command(cli.command, &config).await?;
    Ok(ExitCode::from(exit_status(outcome)))
}

/// Exit status for an outcome; codes outside 0..=255 become 1
fn exit_status(outcome: Outcome) -> u8 {
    u8::try_from(outcome.code()).unwrap_or(1)
}
