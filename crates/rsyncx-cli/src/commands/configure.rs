//! Configure command implementation

use std::path::Path;

use colored::Colorize;
use rsyncx_core::ConfigResolver;

use super::config_paths;
use crate::error::Result;

/// Write the starter config and filter file if missing and create the data
/// directories.
pub fn run_configure(config: Option<&Path>) -> Result<()> {
    let resolver = ConfigResolver::new(config_paths(config)?);
    let report = resolver.configure()?;

    for (path, created) in [
        (&report.config_file, report.config_created),
        (&report.filter_file, report.filter_created),
    ] {
        if created {
            println!("{} Created {}", "OK".green().bold(), path.display());
        } else {
            println!(
                "{} {} already exists, left untouched",
                "=>".blue().bold(),
                path.display()
            );
        }
    }
    println!("{}: {}", "Data".dimmed(), report.data_dir.display());

    if report.config_created {
        println!();
        println!(
            "Edit {} to define your servers and groups, then run {}.",
            report.config_file.display(),
            "rsyncx plan".cyan()
        );
    }
    Ok(())
}
