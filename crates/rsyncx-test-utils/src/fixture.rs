//! [`SyncFixture`] builder for synchronization scenarios.
//!
//! The remote side is a plain directory, so scenarios run through the real
//! [`DirectoryTransport`](rsyncx_core::DirectoryTransport) without a network.
//! File times are set explicitly; `mtime` arguments are seconds after
//! [`SyncFixture::BASE_TIME`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rsyncx_core::{DataLayout, RemoteLocation, SyncEngine, SyncGroup, SyncReport};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Set a file's modification time to `BASE_TIME + secs`.
pub fn set_mtime(path: &Path, secs: u64) {
    let when = SystemTime::UNIX_EPOCH + Duration::from_secs(SyncFixture::BASE_TIME + secs);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

fn write_at(root: &Path, rel: &str, content: &str, secs: u64) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    set_mtime(&path, secs);
}

fn read_at(root: &Path, rel: &str) -> Option<String> {
    fs::read_to_string(root.join(rel)).ok()
}

fn remove_at(root: &Path, rel: &str) {
    fs::remove_file(root.join(rel)).unwrap();
}

/// Relative paths of every file below `root`, sorted.
fn files_below(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            Some(rel.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    out.sort();
    out
}

/// Paths inside a group's bin with the partition directory stripped.
fn bin_contents(group_bin: &Path) -> Vec<String> {
    let mut out: Vec<String> = files_below(group_bin)
        .into_iter()
        .filter_map(|p| p.split_once('/').map(|(_, rest)| rest.to_string()))
        .collect();
    out.sort();
    out
}

/// One shared remote directory plus per-machine local trees.
///
/// # Example
///
/// ```rust,no_run
/// use rsyncx_test_utils::SyncFixture;
///
/// let fixture = SyncFixture::new();
/// let laptop = fixture.machine("laptop");
/// laptop.write("notes.txt", "hello", 10);
/// laptop.run();
/// assert_eq!(fixture.read_remote("notes.txt").as_deref(), Some("hello"));
/// ```
pub struct SyncFixture {
    temp: TempDir,
    group: String,
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFixture {
    /// Arbitrary fixed epoch so scenarios read as small offsets.
    pub const BASE_TIME: u64 = 1_700_000_000;

    pub fn new() -> Self {
        Self::with_group("docs")
    }

    pub fn with_group(group: &str) -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("remote")).unwrap();
        Self {
            temp,
            group: group.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn group_name(&self) -> &str {
        &self.group
    }

    pub fn remote(&self) -> PathBuf {
        self.root().join("remote")
    }

    /// A machine with its own local tree and data directory.
    pub fn machine(&self, name: &str) -> Machine {
        let base = self.root().join("machines").join(name);
        let local = base.join("local");
        let data = base.join("data");
        fs::create_dir_all(&local).unwrap();
        fs::create_dir_all(&data).unwrap();
        Machine {
            local,
            data,
            remote: self.remote(),
            group: self.group.clone(),
        }
    }

    pub fn write_remote(&self, rel: &str, content: &str, mtime: u64) {
        write_at(&self.remote(), rel, content, mtime);
    }

    pub fn read_remote(&self, rel: &str) -> Option<String> {
        read_at(&self.remote(), rel)
    }

    pub fn remove_remote(&self, rel: &str) {
        remove_at(&self.remote(), rel);
    }

    /// Files in the remote tree, excluding the bin.
    pub fn remote_files(&self) -> Vec<String> {
        files_below(&self.remote())
            .into_iter()
            .filter(|p| !p.starts_with("_trash/"))
            .collect()
    }

    /// Files archived in the remote bin (partition stripped).
    pub fn remote_trash(&self) -> Vec<String> {
        bin_contents(&self.remote().join("_trash").join(&self.group))
    }
}

/// A simulated machine syncing the fixture's group.
pub struct Machine {
    local: PathBuf,
    data: PathBuf,
    remote: PathBuf,
    group: String,
}

impl Machine {
    pub fn local(&self) -> &Path {
        &self.local
    }

    pub fn data(&self) -> &Path {
        &self.data
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data)
    }

    pub fn group(&self) -> SyncGroup {
        SyncGroup::new(
            &self.group,
            &self.local,
            RemoteLocation::Directory(self.remote.clone()),
        )
        .unwrap()
    }

    /// Engine with short probe and lock bounds.
    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.layout())
            .with_probe_timeout(Duration::from_millis(200))
            .with_lock_timeout(Duration::from_secs(1))
    }

    pub fn run(&self) -> SyncReport {
        self.engine().run(&self.group()).unwrap()
    }

    pub fn pull(&self) -> SyncReport {
        self.engine().pull(&self.group()).unwrap()
    }

    pub fn push(&self) -> SyncReport {
        self.engine().push(&self.group()).unwrap()
    }

    pub fn write(&self, rel: &str, content: &str, mtime: u64) {
        write_at(&self.local, rel, content, mtime);
    }

    pub fn read(&self, rel: &str) -> Option<String> {
        read_at(&self.local, rel)
    }

    pub fn remove(&self, rel: &str) {
        remove_at(&self.local, rel);
    }

    pub fn files(&self) -> Vec<String> {
        files_below(&self.local)
    }

    /// Files archived in this machine's local bin (partition stripped).
    pub fn trash(&self) -> Vec<String> {
        bin_contents(&self.layout().trash_root().join(&self.group))
    }

    /// Files in this machine's copy of the remote bin (partition stripped).
    pub fn remote_trash_copy(&self) -> Vec<String> {
        bin_contents(&self.layout().remote_trash_root().join(&self.group))
    }
}
