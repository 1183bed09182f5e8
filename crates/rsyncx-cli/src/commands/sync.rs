//! Plan, pull, push and run command implementations

use std::path::Path;

use colored::Colorize;
use rsyncx_core::{Plan, PlanAction, SkipReason, SyncReport, SyncVerb};

use super::{finish, load_config, report_group_error, select_groups};
use crate::error::Result;

/// Run a synchronization verb for one group or all of them.
///
/// Every selected group is attempted; the command fails if any group did.
pub fn run_sync(config: Option<&Path>, group: Option<&str>, verb: SyncVerb) -> Result<()> {
    let resolved = load_config(config)?;
    let groups = select_groups(&resolved, group)?;
    let engine = resolved.engine();

    let mut failed = 0;
    for group in &groups {
        println!(
            "{} {} {}...",
            "=>".blue().bold(),
            verb_label(verb),
            group.name.cyan()
        );
        match engine.sync(group, verb) {
            Ok(report) => {
                print_report(&report);
                if !report.is_success() {
                    failed += 1;
                }
            }
            Err(e) => report_group_error(&group.name, &e, &mut failed),
        }
    }
    finish(failed, groups.len())
}

/// Show what a run would do for one group or all of them.
pub fn run_plan(config: Option<&Path>, group: Option<&str>) -> Result<()> {
    let resolved = load_config(config)?;
    let groups = select_groups(&resolved, group)?;
    let engine = resolved.engine();

    let mut failed = 0;
    for group in &groups {
        match engine.plan(group) {
            Ok(preview) => {
                println!(
                    "{} {} via {} endpoint {} ({})",
                    "=>".blue().bold(),
                    group.name.cyan(),
                    preview.endpoint.role,
                    preview.endpoint.location,
                    preview.mode
                );
                print_plan(&preview.pull);
                print_plan(&preview.push);
                if preview.pull.is_empty() && preview.push.is_empty() {
                    println!("   {}", "Nothing to do.".dimmed());
                }
            }
            Err(e) => report_group_error(&group.name, &e, &mut failed),
        }
    }
    finish(failed, groups.len())
}

fn verb_label(verb: SyncVerb) -> &'static str {
    match verb {
        SyncVerb::Pull => "Pulling",
        SyncVerb::Push => "Pushing",
        SyncVerb::Run => "Synchronizing",
    }
}

fn print_plan(plan: &Plan) {
    for action in plan.actions() {
        match action {
            PlanAction::Skip(_, SkipReason::InSync) => {}
            PlanAction::Skip(path, reason) => {
                println!("   {} {} ({})", "!".yellow(), path, reason);
            }
            PlanAction::Pull(path) => println!("   {} pull {}", "<".green(), path),
            PlanAction::Push(path) => println!("   {} push {}", ">".green(), path),
            PlanAction::TrashLocal(path) => {
                println!("   {} archive local {}", "-".red(), path)
            }
            PlanAction::TrashRemote(path) => {
                println!("   {} archive remote {}", "-".red(), path)
            }
        }
    }
}

fn print_report(report: &SyncReport) {
    for line in report.action_lines() {
        println!("   {}", line);
    }
    for (path, reason) in &report.skipped {
        if *reason == SkipReason::AmbiguousConflict {
            println!("   {} {}: {}", "!".yellow(), path, reason);
        }
    }
    for failure in &report.failures {
        println!(
            "   {} {}: {}",
            "ERROR".red().bold(),
            failure.action,
            failure.message
        );
    }

    if report.is_success() {
        println!(
            "{} {} ({} changed)",
            "OK".green().bold(),
            report.group,
            report.changed()
        );
    }
}
