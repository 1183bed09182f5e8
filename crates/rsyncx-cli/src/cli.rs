//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// rsyncx - Two-way folder synchronization with a recycle bin
#[derive(Parser, Debug)]
#[command(name = "rsyncx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "RSYNCX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the config file, filter file and data directories
    ///
    /// Existing files are left untouched.
    Configure,

    /// Preview what a run would do, without changing anything
    Plan {
        /// Group to preview (all groups if omitted)
        group: Option<String>,
    },

    /// Bring remote changes and deletions to this machine
    Pull {
        /// Group to pull (all groups if omitted)
        group: Option<String>,
    },

    /// Send local changes and deletions to the remote
    Push {
        /// Group to push (all groups if omitted)
        group: Option<String>,
    },

    /// Pull, then push
    ///
    /// Examples:
    ///   rsyncx run           # Every configured group
    ///   rsyncx run docs      # Only the 'docs' group
    Run {
        /// Group to synchronize (all groups if omitted)
        group: Option<String>,
    },

    /// Empty the recycle bins of a group
    ///
    /// The deletion ledger is kept.
    Purge {
        /// Group whose bins to empty (all groups if omitted)
        group: Option<String>,

        /// Only remove partitions older than this many days
        #[arg(long, value_name = "N")]
        older_than_days: Option<u32>,
    },

    /// Show when each group was last synchronized
    Time {
        /// Group to show (all groups if omitted)
        group: Option<String>,
    },

    /// List files archived for a group
    Deleted {
        /// Group whose deletion ledger to show
        group: String,
    },
}
