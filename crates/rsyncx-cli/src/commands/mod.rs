//! Command implementations for rsyncx-cli

pub mod configure;
pub mod status;
pub mod sync;
pub mod trash;

pub use configure::run_configure;
pub use status::run_time;
pub use sync::{run_plan, run_sync};
pub use trash::{run_deleted, run_purge};

use std::path::Path;

use colored::Colorize;
use rsyncx_core::{ConfigPaths, ConfigResolver, GroupRegistry, ResolvedConfig, SyncGroup};

use crate::error::{CliError, Result};

/// Config location: the explicit file, or the platform default.
pub fn config_paths(config: Option<&Path>) -> Result<ConfigPaths> {
    match config {
        Some(path) => Ok(ConfigPaths::from_file(path)),
        None => ConfigPaths::platform_default().ok_or(CliError::NoConfigDir),
    }
}

/// Load and validate the configuration.
pub fn load_config(config: Option<&Path>) -> Result<ResolvedConfig> {
    let resolver = ConfigResolver::new(config_paths(config)?);
    match resolver.resolve() {
        Err(rsyncx_core::Error::ConfigNotFound { path }) => Err(CliError::NotConfigured { path }),
        other => Ok(other?),
    }
}

/// The named group, or every configured group.
pub fn select_groups(config: &ResolvedConfig, name: Option<&str>) -> Result<Vec<SyncGroup>> {
    match name {
        Some(name) => Ok(vec![config.find_group(name)?]),
        None if config.groups.is_empty() => Err(CliError::NoGroups),
        None => Ok(config.list_groups()),
    }
}

/// Print the per-group failure line and tally it.
pub(crate) fn report_group_error(group: &str, error: &dyn std::fmt::Display, failed: &mut usize) {
    println!("{} {}: {}", "ERROR".red().bold(), group.cyan(), error);
    *failed += 1;
}

/// Turn a failure tally into the process outcome.
pub(crate) fn finish(failed: usize, total: usize) -> Result<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::GroupsFailed { failed, total })
    }
}
