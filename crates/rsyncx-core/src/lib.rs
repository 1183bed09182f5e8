//! Synchronization decision engine for rsyncx
//!
//! Keeps a local directory ("group") in step with a remote copy across
//! repeated, possibly interrupted runs from several machines, archiving
//! deleted content instead of erasing it:
//!
//! - **StateStore**: last synchronized version of every file, per group
//! - **DeletionLedger**: append-only audit log of archived files
//! - **TrashManager**: move-to-bin with timestamp partitions
//! - **ReachabilityResolver**: primary endpoint first, then the fallback
//! - **SyncPlanner**: two-phase (pull, then push) decision engine
//! - **SyncEngine**: applies plans through a [`TransferExecutor`]
//!
//! # Architecture
//!
//! ```text
//!                 rsyncx-cli
//!                     |
//!                rsyncx-core
//!   config -> SyncEngine -> planner / state / ledger / trash
//!                     |
//!               TransferExecutor (directory | rsync over ssh)
//!                     |
//!                 rsyncx-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rsyncx_core::config::{ConfigPaths, ConfigResolver};
//! use rsyncx_core::{GroupRegistry, SyncVerb};
//!
//! let config = ConfigResolver::new(ConfigPaths::platform_default().unwrap()).resolve()?;
//! let engine = config.engine();
//! for (group, result) in engine.sync_all(&config, SyncVerb::Run) {
//!     println!("{}: {:?}", group, result.map(|r| r.changed()));
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod group;
pub mod layout;
pub mod ledger;
pub mod listing;
pub mod plan;
pub mod reach;
pub mod state;
pub mod sync;
pub mod transfer;
pub mod trash;

pub use config::{ConfigPaths, ConfigResolver, Manifest, ResolvedConfig};
pub use error::{Error, Result};
pub use filter::{DEFAULT_EXCLUDES, ExcludeFilter};
pub use group::{GroupRegistry, RemoteLocation, SshTarget, SyncGroup};
pub use layout::DataLayout;
pub use ledger::{DeletionLedger, DeletionRecord, Origin};
pub use listing::{FileListing, FileMeta, scan_directory};
pub use plan::{Phase, Plan, PlanAction, SkipReason, SyncMode, SyncPlanner};
pub use reach::{Endpoint, EndpointRole, NetworkProbe, Probe, ReachabilityResolver};
pub use state::{StateRecord, StateStore};
pub use sync::{GroupStatus, PurgeReport, SyncEngine, SyncPreview, SyncReport, SyncVerb};
pub use transfer::{
    ActionOutcome, DirectoryTransport, RoutingTransport, RsyncTransport, TransferContext,
    TransferExecutor,
};
pub use trash::{Partition, TrashEntry, TrashManager};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_config_not_found_displays_path() {
        let error = Error::ConfigNotFound {
            path: PathBuf::from("/path/to/config.toml"),
        };
        assert!(error.to_string().contains("/path/to/config.toml"));
    }

    #[test]
    fn unreachable_lists_endpoints() {
        let error = Error::Unreachable {
            group: "docs".into(),
            tried: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            error.to_string(),
            "Group 'docs' is unreachable (tried: a, b)"
        );
    }
}
