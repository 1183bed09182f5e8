//! rsyncx CLI
//!
//! Two-way synchronization of local folders with a remote, archiving
//! deletions into recycle bins.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use rsyncx_core::SyncVerb;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second init (only possible in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd, cli.config.as_deref()),
        None => {
            println!("{} two-way folder sync", "rsyncx".green().bold());
            println!();
            println!("Run {} for available commands.", "rsyncx --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands, config: Option<&std::path::Path>) -> Result<()> {
    match cmd {
        Commands::Configure => commands::run_configure(config),
        Commands::Plan { group } => commands::run_plan(config, group.as_deref()),
        Commands::Pull { group } => commands::run_sync(config, group.as_deref(), SyncVerb::Pull),
        Commands::Push { group } => commands::run_sync(config, group.as_deref(), SyncVerb::Push),
        Commands::Run { group } => commands::run_sync(config, group.as_deref(), SyncVerb::Run),
        Commands::Purge {
            group,
            older_than_days,
        } => commands::run_purge(config, group.as_deref(), older_than_days),
        Commands::Time { group } => commands::run_time(config, group.as_deref()),
        Commands::Deleted { group } => commands::run_deleted(config, &group),
    }
}
