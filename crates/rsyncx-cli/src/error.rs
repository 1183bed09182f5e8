//! Error types for rsyncx-cli

use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Why an rsyncx invocation failed
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] rsyncx_core::Error),

    /// The configuration file has not been written yet
    #[error("No configuration at {}. Run 'rsyncx configure' first.", path.display())]
    NotConfigured { path: PathBuf },

    #[error("Cannot determine the configuration directory; pass --config")]
    NoConfigDir,

    #[error("No groups are configured")]
    NoGroups,

    /// Some groups of a multi-group command failed; each was reported as it
    /// happened
    #[error("{failed} of {total} groups failed")]
    GroupsFailed { failed: usize, total: usize },
}
