//! Transport for remotes reachable as a local directory

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rsyncx_fs::io::temp_path_for;
use rsyncx_fs::RsyncxPath;
use walkdir::WalkDir;

use super::{ActionOutcome, TransferContext, TransferExecutor, missing_root, not_remote};
use crate::group::RemoteLocation;
use crate::ledger::Origin;
use crate::listing::{FileListing, FileMeta, scan_directory, walk_error};
use crate::plan::PlanAction;
use crate::trash::{Partition, TrashManager};
use crate::{Error, Result};

/// Copies files between two directory trees, preserving modification times.
#[derive(Debug, Clone, Default)]
pub struct DirectoryTransport;

impl DirectoryTransport {
    pub fn new() -> Self {
        Self
    }

    fn remote_root<'a>(ctx: &'a TransferContext<'_>) -> Result<&'a Path> {
        match &ctx.endpoint.location {
            RemoteLocation::Directory(path) => Ok(path),
            other => Err(Error::Transfer {
                message: format!("{} is not a directory endpoint", other),
            }),
        }
    }

    fn remote_bin(remote_root: &Path) -> TrashManager {
        TrashManager::new(remote_root.join(RsyncxPath::TrashDir.as_str()))
    }

    fn apply_one(
        &self,
        ctx: &TransferContext<'_>,
        remote_root: &Path,
        action: &PlanAction,
    ) -> ActionOutcome {
        let local_root = &ctx.group.local_root;
        let result = match action {
            PlanAction::Pull(path) => {
                copy_preserving(&path.under(remote_root), &path.under(local_root)).map(|_| None)
            }
            PlanAction::Push(path) => {
                copy_preserving(&path.under(local_root), &path.under(remote_root)).map(|_| None)
            }
            PlanAction::TrashRemote(path) => Self::remote_bin(remote_root)
                .trash(&ctx.group.name, remote_root, path, Origin::Local, ctx.partition)
                .map(|entry| Some(entry.location.display().to_string())),
            other => return not_remote(other),
        };

        match result {
            Ok(Some(trash_path)) => ActionOutcome::archived(action.clone(), trash_path),
            Ok(None) => ActionOutcome::done(action.clone()),
            Err(e) => {
                tracing::warn!("{} failed: {}", action, e);
                ActionOutcome::failed(action.clone(), e.to_string())
            }
        }
    }
}

impl TransferExecutor for DirectoryTransport {
    fn list(&self, ctx: &TransferContext<'_>) -> Result<FileListing> {
        let root = Self::remote_root(ctx)?;
        if !root.is_dir() {
            return missing_root(ctx);
        }
        scan_directory(root, ctx.filter)
    }

    fn ensure_root(&self, ctx: &TransferContext<'_>) -> Result<()> {
        let root = Self::remote_root(ctx)?;
        fs::create_dir_all(root).map_err(|e| rsyncx_fs::Error::io(root, e))?;
        Ok(())
    }

    fn fetch_bin(&self, ctx: &TransferContext<'_>, destination: &Path) -> Result<()> {
        let bin = Self::remote_bin(Self::remote_root(ctx)?).group_dir(&ctx.group.name);
        if !bin.is_dir() {
            return Ok(());
        }

        let mut copied = 0usize;
        for entry in WalkDir::new(&bin).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| walk_error(&bin, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&bin) else {
                continue;
            };
            let target = destination.join(relative);
            if same_version(entry.path(), &target) {
                continue;
            }
            copy_preserving(entry.path(), &target)?;
            copied += 1;
        }
        tracing::debug!("Copied {} remote bin entries of '{}'", copied, ctx.group.name);
        Ok(())
    }

    fn apply(&self, ctx: &TransferContext<'_>, actions: &[PlanAction]) -> Vec<ActionOutcome> {
        let remote_root = match Self::remote_root(ctx) {
            Ok(root) => root,
            Err(e) => {
                return actions
                    .iter()
                    .map(|a| ActionOutcome::failed(a.clone(), e.to_string()))
                    .collect();
            }
        };
        actions
            .iter()
            .map(|action| self.apply_one(ctx, remote_root, action))
            .collect()
    }

    fn purge(
        &self,
        ctx: &TransferContext<'_>,
        older_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Partition>> {
        Self::remote_bin(Self::remote_root(ctx)?).purge(&ctx.group.name, older_than)
    }
}

fn meta_of(path: &Path) -> Option<FileMeta> {
    let metadata = fs::metadata(path).ok()?;
    Some(FileMeta::from_system_time(metadata.modified().ok()?, metadata.len()))
}

fn same_version(a: &Path, b: &Path) -> bool {
    match (meta_of(a), meta_of(b)) {
        (Some(a), Some(b)) => a.same_version(&b),
        _ => false,
    }
}

/// Copy `source` over `destination` through a temporary sibling, then carry
/// the source's modification time over.
fn copy_preserving(source: &Path, destination: &Path) -> Result<()> {
    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| rsyncx_fs::Error::io(source, e))?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| rsyncx_fs::Error::io(parent, e))?;
    }

    let temp: PathBuf = temp_path_for(destination);
    let copied = fs::copy(source, &temp)
        .and_then(|_| fs::File::options().write(true).open(&temp))
        .and_then(|file| file.set_modified(modified))
        .and_then(|_| fs::rename(&temp, destination));

    if let Err(e) = copied {
        let _ = fs::remove_file(&temp);
        return Err(rsyncx_fs::Error::io(destination, e).into());
    }
    tracing::debug!("Copied {} -> {}", source.display(), destination.display());
    Ok(())
}
