//! File listings compared by the planner
//!
//! Both sides of a group are reduced to `relative path -> (mtime, size)`.
//! Modification times are truncated to whole seconds so listings taken from
//! filesystems (or remote `find` output) with different precision compare
//! equal.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Timelike, Utc};
use rsyncx_fs::NormalizedPath;
use walkdir::WalkDir;

use crate::filter::ExcludeFilter;
use crate::{Error, Result};

/// Drop sub-second precision.
pub fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Modification time and size of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub mtime: DateTime<Utc>,
    pub size: u64,
}

impl FileMeta {
    pub fn new(mtime: DateTime<Utc>, size: u64) -> Self {
        Self {
            mtime: truncate_to_second(mtime),
            size,
        }
    }

    pub fn from_system_time(mtime: SystemTime, size: u64) -> Self {
        Self::new(DateTime::<Utc>::from(mtime), size)
    }

    /// Same second and same size: treated as the same version.
    pub fn same_version(&self, other: &FileMeta) -> bool {
        self.mtime == other.mtime && self.size == other.size
    }
}

/// Snapshot of the regular files below one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    files: BTreeMap<NormalizedPath, FileMeta>,
}

impl FileListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: NormalizedPath, meta: FileMeta) {
        self.files.insert(path, meta);
    }

    pub fn remove(&mut self, path: &NormalizedPath) -> Option<FileMeta> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &NormalizedPath) -> Option<&FileMeta> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedPath, &FileMeta)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop every path the filter excludes.
    pub fn retain_included(&mut self, filter: &ExcludeFilter) {
        self.files.retain(|path, _| !filter.is_excluded(path.as_str()));
    }

    /// Parse `find -printf '%P\t%T@\t%s\n'` output.
    ///
    /// Lines with unsafe paths (absolute, `..`) or malformed fields are
    /// skipped with a warning rather than failing the whole listing.
    pub fn parse_find_output(output: &str) -> Self {
        let mut listing = Self::new();
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            match parse_find_line(line) {
                Ok((path, meta)) => listing.insert(path, meta),
                Err(e) => tracing::warn!("Skipping remote listing line {:?}: {}", line, e),
            }
        }
        listing
    }
}

impl FromIterator<(NormalizedPath, FileMeta)> for FileListing {
    fn from_iter<T: IntoIterator<Item = (NormalizedPath, FileMeta)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

fn parse_find_line(line: &str) -> Result<(NormalizedPath, FileMeta)> {
    let mut fields = line.rsplitn(3, '\t');
    let (Some(size), Some(mtime), Some(path)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::Transfer {
            message: "expected three tab-separated fields".to_string(),
        });
    };

    let size: u64 = size.trim().parse().map_err(|_| Error::Transfer {
        message: format!("invalid size '{}'", size),
    })?;
    // %T@ prints fractional seconds; only the integral part is kept.
    let seconds: i64 = mtime
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Transfer {
            message: format!("invalid mtime '{}'", mtime),
        })?;
    let mtime = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| Error::Transfer {
        message: format!("mtime out of range '{}'", seconds),
    })?;

    Ok((NormalizedPath::relative(path)?, FileMeta::new(mtime, size)))
}

/// Recursively list regular files below `root`.
///
/// A missing root yields an empty listing. Symbolic links are not followed
/// and not listed; excluded directories are not descended into.
pub fn scan_directory(root: &Path, filter: &ExcludeFilter) -> Result<FileListing> {
    let mut listing = FileListing::new();
    if !root.is_dir() {
        tracing::debug!("Root {} does not exist, empty listing", root.display());
        return Ok(listing);
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir()
                || !filter.is_excluded_dir(relative_to(root, entry.path()).as_str())
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_to(root, entry.path());
        if filter.is_excluded(relative.as_str()) {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| walk_error(root, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| rsyncx_fs::Error::io(entry.path(), e))?;
        listing.insert(relative, FileMeta::from_system_time(modified, metadata.len()));
    }
    Ok(listing)
}

fn relative_to(root: &Path, path: &Path) -> NormalizedPath {
    NormalizedPath::new(path.strip_prefix(root).unwrap_or(path))
}

pub(crate) fn walk_error(root: &Path, e: walkdir::Error) -> Error {
    let path = e.path().unwrap_or(root).to_path_buf();
    rsyncx_fs::Error::io(path, e.into()).into()
}
