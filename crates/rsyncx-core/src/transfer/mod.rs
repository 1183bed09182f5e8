//! Executing plans against a remote endpoint
//!
//! The planner only decides; a [`TransferExecutor`] lists the remote side and
//! carries out pulls, pushes and remote archiving. Implementations:
//!
//! - [`DirectoryTransport`]: the remote is a directory on a mounted filesystem
//! - [`RsyncTransport`]: the remote is an SSH server, driven through `ssh`/`rsync`
//! - [`RoutingTransport`]: dispatches to one of the above per endpoint kind

mod directory;
mod rsync;

pub use directory::DirectoryTransport;
pub use rsync::{RsyncTransport, shell_quote};

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::filter::ExcludeFilter;
use crate::group::{RemoteLocation, SyncGroup};
use crate::listing::FileListing;
use crate::plan::{PlanAction, SyncMode};
use crate::reach::Endpoint;
use crate::trash::Partition;
use crate::{Error, Result};

/// Everything an executor needs to know about the current run.
#[derive(Debug, Clone, Copy)]
pub struct TransferContext<'a> {
    pub group: &'a SyncGroup,
    pub endpoint: &'a Endpoint,
    pub filter: &'a ExcludeFilter,
    /// Bin partition for remote archiving in this run
    pub partition: &'a Partition,
    /// Decides how a missing remote root is treated
    pub mode: SyncMode,
}

/// Result of one attempted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: PlanAction,
    /// Where the content was archived, for `TrashRemote`
    pub trash_path: Option<String>,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn done(action: PlanAction) -> Self {
        Self {
            action,
            trash_path: None,
            error: None,
        }
    }

    pub fn archived(action: PlanAction, trash_path: impl Into<String>) -> Self {
        Self {
            action,
            trash_path: Some(trash_path.into()),
            error: None,
        }
    }

    pub fn failed(action: PlanAction, error: impl Into<String>) -> Self {
        Self {
            action,
            trash_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Moves bytes between the local root and a remote endpoint.
pub trait TransferExecutor {
    /// List the remote root, with the context's exclusions applied.
    ///
    /// A missing root lists as empty on a first sync; on an incremental run
    /// it is [`Error::RemoteRootMissing`].
    fn list(&self, ctx: &TransferContext<'_>) -> Result<FileListing>;

    /// Create the remote root (and its parents) if it does not exist yet.
    fn ensure_root(&self, ctx: &TransferContext<'_>) -> Result<()>;

    /// Copy the group's remote bin into `destination`, keeping the
    /// `<partition>/<relative-path>` layout. Entries already present with
    /// the same size and modification time are not copied again.
    fn fetch_bin(&self, ctx: &TransferContext<'_>, destination: &Path) -> Result<()>;

    /// Apply `Pull`, `Push` and `TrashRemote` actions.
    ///
    /// Every action gets an outcome; a failure of one path never prevents
    /// the others from being attempted.
    fn apply(&self, ctx: &TransferContext<'_>, actions: &[PlanAction]) -> Vec<ActionOutcome>;

    /// Remove remote bin partitions for the group (all, or only those
    /// created before `older_than`). Returns the removed partitions.
    fn purge(
        &self,
        ctx: &TransferContext<'_>,
        older_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Partition>>;
}

/// Chooses the transport matching the resolved endpoint.
#[derive(Debug, Clone, Default)]
pub struct RoutingTransport {
    directory: DirectoryTransport,
    rsync: RsyncTransport,
}

impl RoutingTransport {
    pub fn new(directory: DirectoryTransport, rsync: RsyncTransport) -> Self {
        Self { directory, rsync }
    }

    fn backend(&self, location: &RemoteLocation) -> &dyn TransferExecutor {
        match location {
            RemoteLocation::Directory(_) => &self.directory,
            RemoteLocation::Ssh(_) => &self.rsync,
        }
    }
}

impl TransferExecutor for RoutingTransport {
    fn list(&self, ctx: &TransferContext<'_>) -> Result<FileListing> {
        self.backend(&ctx.endpoint.location).list(ctx)
    }

    fn ensure_root(&self, ctx: &TransferContext<'_>) -> Result<()> {
        self.backend(&ctx.endpoint.location).ensure_root(ctx)
    }

    fn fetch_bin(&self, ctx: &TransferContext<'_>, destination: &Path) -> Result<()> {
        self.backend(&ctx.endpoint.location).fetch_bin(ctx, destination)
    }

    fn apply(&self, ctx: &TransferContext<'_>, actions: &[PlanAction]) -> Vec<ActionOutcome> {
        self.backend(&ctx.endpoint.location).apply(ctx, actions)
    }

    fn purge(
        &self,
        ctx: &TransferContext<'_>,
        older_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Partition>> {
        self.backend(&ctx.endpoint.location).purge(ctx, older_than)
    }
}

/// Listing of a remote root that does not exist.
pub(crate) fn missing_root(ctx: &TransferContext<'_>) -> Result<FileListing> {
    match ctx.mode {
        SyncMode::FirstSync => {
            tracing::info!("Remote root {} does not exist yet", ctx.endpoint.location);
            Ok(FileListing::new())
        }
        SyncMode::Incremental => Err(Error::RemoteRootMissing {
            group: ctx.group.name.clone(),
            location: ctx.endpoint.location.to_string(),
        }),
    }
}

/// Unsupported action handed to an executor.
pub(crate) fn not_remote(action: &PlanAction) -> ActionOutcome {
    ActionOutcome::failed(
        action.clone(),
        format!("'{}' is not a remote operation", action.label()),
    )
}
