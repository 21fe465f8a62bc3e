//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod backup;
mod maintenance;

pub use backup::BackupArgs;

use anyhow::Result;
use backstop_core::config::Config;
use backstop_core::outcome::Outcome;
use clap::Subcommand;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run `tsm maintenance backup` locally and stream its output
    Maintenance {
        /// Run `tsm status -v` instead, to check the setup
        #[arg(long)]
        status: bool,
    },
    /// Send the value 1 to the monitoring item
    Zsend,
    /// Start a backup through the TSM API
    Start(BackupArgs),
    /// List TSM jobs
    List,
    /// Show the state of a previously started job
    Job {
        /// Job ID
        id: String,

        /// Follow the job until it finishes
        #[arg(long)]
        wait: bool,
    },
    /// Show the state of the most recently created job
    Latest {
        /// Follow the job until it finishes
        #[arg(long)]
        wait: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// The outcome of the run, used as the process exit status
pub async fn handle_command(command: Commands, config: &Config) -> Result<Outcome> {
    match command {
        Commands::Maintenance { status } => maintenance::run(status, config).await,
        Commands::Zsend => maintenance::zsend(config).await,
        Commands::Start(args) => backup::start(args, config).await,
        Commands::List => backup::list(config).await,
        Commands::Job { id, wait } => backup::show(&id, wait, config).await,
        Commands::Latest { wait } => backup::latest(wait, config).await,
    }
}
