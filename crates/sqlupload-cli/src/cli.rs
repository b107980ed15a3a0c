//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};

/// sqlupload - Move the dynamic part of generated reports into a database
#[derive(Parser, Debug)]
#[command(name = "sqlupload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to $SQLUPLOAD_CONFIG, then the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one synchronization pass
    ///
    /// Examples:
    ///   sqlupload run                      # Use the default config
    ///   sqlupload -c weewx.toml run        # Use a specific config
    ///   sqlupload run --dry-run            # Log what would change
    Run {
        /// Log store and filesystem changes without making them
        #[arg(long)]
        dry_run: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run synchronization passes on an interval until interrupted
    ///
    /// `run-once` artifacts are only processed by the first pass.
    Watch {
        /// Seconds between passes
        #[arg(short, long, default_value_t = 300, env = "SQLUPLOAD_INTERVAL")]
        interval: u64,

        /// Stop after this many passes
        #[arg(long)]
        max_runs: Option<u64>,

        /// Log store and filesystem changes without making them
        #[arg(long)]
        dry_run: bool,
    },

    /// Upload newline-delimited JSON telemetry packets read from stdin
    Telemetry {
        /// Log store writes without making them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration and list resolved artifacts
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verify the CLI is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_args() {
        let cli = Cli::parse_from::<[&str; 0], &str>([]);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sqlupload", "run", "-v", "--config", "weewx.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("weewx.toml"));
    }

    #[test]
    fn parse_run_command() {
        let cli = Cli::parse_from(["sqlupload", "run", "--dry-run"]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                dry_run: true,
                json: false
            })
        );
    }

    #[test]
    fn parse_watch_defaults() {
        let cli = Cli::parse_from(["sqlupload", "watch"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Watch {
                max_runs: None,
                dry_run: false,
                ..
            })
        ));
    }

    #[test]
    fn parse_watch_interval() {
        let cli = Cli::parse_from(["sqlupload", "watch", "--interval", "60", "--max-runs", "3"]);
        assert_eq!(
            cli.command,
            Some(Commands::Watch {
                interval: 60,
                max_runs: Some(3),
                dry_run: false
            })
        );
    }

    #[test]
    fn parse_telemetry_command() {
        let cli = Cli::parse_from(["sqlupload", "telemetry"]);
        assert_eq!(cli.command, Some(Commands::Telemetry { dry_run: false }));
    }
}
