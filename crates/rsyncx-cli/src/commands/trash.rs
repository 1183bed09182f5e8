//! Purge and deleted command implementations

use std::path::Path;

use chrono::{Duration, Local, Utc};
use colored::Colorize;

use super::{finish, load_config, report_group_error, select_groups};
use crate::error::Result;

/// Remove bin partitions, optionally only those older than `older_than_days`.
pub fn run_purge(
    config: Option<&Path>,
    group: Option<&str>,
    older_than_days: Option<u32>,
) -> Result<()> {
    let resolved = load_config(config)?;
    let groups = select_groups(&resolved, group)?;
    let engine = resolved.engine();
    let cutoff = older_than_days.map(|days| Utc::now() - Duration::days(i64::from(days)));

    let mut failed = 0;
    for group in &groups {
        println!("{} Purging {}...", "=>".blue().bold(), group.name.cyan());
        match engine.purge(group, cutoff) {
            Ok(report) => {
                println!(
                    "{} {}: {} local, {} remote, {} copied remote partitions removed",
                    "OK".green().bold(),
                    group.name,
                    report.local.len(),
                    report.remote.len(),
                    report.remote_copy.len()
                );
                if let Some(error) = report.remote_error {
                    println!("   {} remote bin skipped: {}", "!".yellow(), error);
                }
            }
            Err(e) => report_group_error(&group.name, &e, &mut failed),
        }
    }
    finish(failed, groups.len())
}

/// Print a group's deletion ledger, oldest first.
pub fn run_deleted(config: Option<&Path>, group: &str) -> Result<()> {
    let resolved = load_config(config)?;
    let group = select_groups(&resolved, Some(group))?.remove(0);
    let records = resolved.engine().deletions(&group.name)?;

    if records.is_empty() {
        println!("{} nothing archived for {}", "=>".blue().bold(), group.name.cyan());
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<6}  {}  {}",
            record
                .deleted_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            record.origin.to_string().yellow(),
            record.path.cyan(),
            record.trash_path.dimmed()
        );
    }
    Ok(())
}
