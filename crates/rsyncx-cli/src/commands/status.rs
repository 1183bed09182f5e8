//! Time command implementation

use std::path::Path;

use chrono::Local;
use colored::Colorize;

use super::{load_config, select_groups};
use crate::error::Result;

/// Show the last synchronization time and tracked file count per group.
pub fn run_time(config: Option<&Path>, group: Option<&str>) -> Result<()> {
    let resolved = load_config(config)?;
    let groups = select_groups(&resolved, group)?;
    let engine = resolved.engine();

    for group in &groups {
        let status = engine.status(&group.name);
        let when = match status.last_sync_at {
            Some(at) => at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .normal(),
            None => "never".yellow(),
        };
        println!(
            "{:<16} {}  {}",
            group.name.cyan(),
            when,
            format!("({} files)", status.tracked_files).dimmed()
        );
    }
    Ok(())
}
