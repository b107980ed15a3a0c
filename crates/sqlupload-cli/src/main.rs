//! sqlupload CLI
//!
//! Splits generated weather report artifacts into static shells and
//! database-held payloads.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Some(cmd) => execute_command(cmd, config).await,
        None => {
            println!("{} Report artifact uploader", "sqlupload".green().bold());
            println!();
            println!("Run {} for available commands.", "sqlupload --help".cyan());
            Ok(())
        }
    }
}

async fn execute_command(cmd: Commands, config: Option<&str>) -> Result<()> {
    match cmd {
        Commands::Run { dry_run, json } => commands::run_sync(config, dry_run, json).await,
        Commands::Watch {
            interval,
            max_runs,
            dry_run,
        } => commands::run_watch(config, dry_run, interval, max_runs).await,
        Commands::Telemetry { dry_run } => commands::run_telemetry(config, dry_run).await,
        Commands::Check => commands::run_check(config),
    }
}
