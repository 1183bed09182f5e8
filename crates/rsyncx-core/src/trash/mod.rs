//! Reversible deletion into a partitioned recycle bin
//!
//! Archived content keeps its group-relative path:
//! `<bin_root>/<group>/<partition>/<relative-path>`. The source is only
//! removed once the content is known to be in the bin.

mod partition;

pub use partition::Partition;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rsyncx_fs::NormalizedPath;
use rsyncx_fs::checksum::files_match;
use walkdir::WalkDir;

use crate::ledger::Origin;
use crate::{Error, Result};

/// A file or directory now held in the bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    pub group: String,
    pub relative: NormalizedPath,
    pub partition: Partition,
    pub origin: Origin,
    /// Final location inside the bin
    pub location: PathBuf,
    /// The content was already archived by an earlier attempt
    pub already_present: bool,
}

/// Moves content into a bin rooted at `bin_root`.
#[derive(Debug, Clone)]
pub struct TrashManager {
    bin_root: PathBuf,
}

impl TrashManager {
    pub fn new(bin_root: impl Into<PathBuf>) -> Self {
        Self {
            bin_root: bin_root.into(),
        }
    }

    pub fn bin_root(&self) -> &Path {
        &self.bin_root
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.bin_root.join(group)
    }

    pub fn partition_dir(&self, group: &str, partition: &Partition) -> PathBuf {
        self.group_dir(group).join(partition.as_str())
    }

    /// Archive `source_root/relative` into the given partition.
    ///
    /// Calling this again for the same event is a no-op success. A different
    /// version already at the destination is kept and the new content gets a
    /// numbered sibling name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrashFailed`] when the content could not be placed in
    /// the bin; the source is left untouched in that case.
    pub fn trash(
        &self,
        group: &str,
        source_root: &Path,
        relative: &NormalizedPath,
        origin: Origin,
        partition: &Partition,
    ) -> Result<TrashEntry> {
        let source = relative.under(source_root);
        let base = relative.under(&self.partition_dir(group, partition));
        let failed = |reason: String| Error::TrashFailed {
            path: relative.to_string(),
            reason,
        };

        let mut entry = TrashEntry {
            group: group.to_string(),
            relative: relative.clone(),
            partition: partition.clone(),
            origin,
            location: base.clone(),
            already_present: false,
        };

        let source_exists = match fs::symlink_metadata(&source) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(failed(e.to_string())),
        };

        if !source_exists {
            if base.exists() {
                tracing::debug!("{} already archived in {}", relative, partition);
                entry.already_present = true;
                return Ok(entry);
            }
            return Err(failed("source does not exist".to_string()));
        }

        let (destination, identical) = self
            .free_destination(&source, &base)
            .map_err(|e| failed(e.to_string()))?;
        entry.location = destination.clone();

        if identical {
            // A previous attempt copied but crashed before removing the source.
            remove_path(&source).map_err(|e| failed(e.to_string()))?;
            entry.already_present = true;
            tracing::debug!("{} already archived, removed leftover source", relative);
            return Ok(entry);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }

        if let Err(rename_err) = fs::rename(&source, &destination) {
            tracing::debug!(
                "Rename into bin failed ({}), falling back to copy for {}",
                rename_err,
                relative
            );
            copy_verify_remove(&source, &destination).map_err(failed)?;
        }

        tracing::info!("Archived {} -> {}", relative, destination.display());
        Ok(entry)
    }

    /// Pick where `source` should go: the first candidate that is free or
    /// already holds identical content.
    fn free_destination(&self, source: &Path, base: &Path) -> std::io::Result<(PathBuf, bool)> {
        let mut candidate = base.to_path_buf();
        let mut n = 0u32;
        loop {
            if !candidate.exists() {
                return Ok((candidate, false));
            }
            if tree_matches(source, &candidate)? {
                return Ok((candidate, true));
            }
            n += 1;
            let mut name = base
                .file_name()
                .map(|s| s.to_os_string())
                .unwrap_or_default();
            name.push(format!("~{}", n));
            candidate = base.with_file_name(name);
        }
    }

    /// Partitions currently held for a group, oldest first.
    pub fn list_partitions(&self, group: &str) -> Result<Vec<Partition>> {
        let dir = self.group_dir(group);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(rsyncx_fs::Error::io(&dir, e).into()),
        };

        let mut partitions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && let Some(partition) = entry.file_name().to_str().and_then(Partition::parse)
            {
                partitions.push(partition);
            }
        }
        partitions.sort();
        Ok(partitions)
    }

    /// Permanently delete a group's partitions, optionally only those
    /// created before `older_than`. Administrative; never used while syncing.
    pub fn purge(&self, group: &str, older_than: Option<DateTime<Utc>>) -> Result<Vec<Partition>> {
        let mut removed = Vec::new();
        for partition in self.list_partitions(group)? {
            let keep = match (older_than, partition.created_at()) {
                (Some(cutoff), Some(created)) => created >= cutoff,
                _ => false,
            };
            if keep {
                continue;
            }
            let dir = self.partition_dir(group, &partition);
            fs::remove_dir_all(&dir).map_err(|e| rsyncx_fs::Error::io(&dir, e))?;
            tracing::info!("Purged bin partition {}/{}", group, partition);
            removed.push(partition);
        }
        Ok(removed)
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_verify_remove(source: &Path, destination: &Path) -> std::result::Result<(), String> {
    let copied = copy_tree(source, destination).and_then(|_| tree_matches(source, destination));
    match copied {
        Ok(true) => remove_path(source).map_err(|e| format!("archived but source not removed: {}", e)),
        Ok(false) => {
            let _ = remove_path(destination);
            Err("checksum mismatch after copy".to_string())
        }
        Err(e) => {
            let _ = remove_path(destination);
            Err(e.to_string())
        }
    }
}

/// `root/relative`, or `root` itself for the walk's starting entry.
fn rejoin(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = rejoin(destination, relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        fs::copy(entry.path(), &target)?;
        let modified = fs::metadata(entry.path())?.modified()?;
        fs::File::options()
            .write(true)
            .open(&target)?
            .set_modified(modified)?;
    }
    Ok(())
}

/// Relative paths below `root` (the root itself included), flagged as
/// directories or not, in walk order.
fn tree_shape(root: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry?;
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            Ok((relative.to_path_buf(), entry.file_type().is_dir()))
        })
        .collect()
}

/// Whether two files, or two directory trees, hold identical content.
fn tree_matches(a: &Path, b: &Path) -> std::io::Result<bool> {
    let shape = tree_shape(a)?;
    if shape != tree_shape(b)? {
        return Ok(false);
    }
    for (relative, is_dir) in &shape {
        if !is_dir && !files_match(&rejoin(a, relative), &rejoin(b, relative))? {
            return Ok(false);
        }
    }
    Ok(true)
}
