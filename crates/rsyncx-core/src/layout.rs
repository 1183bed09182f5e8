//! On-disk layout of per-group bookkeeping
//!
//! ```text
//! <data_dir>/
//!   groups/<group>/state.json     StateStore
//!   groups/<group>/deleted.json   DeletionLedger
//!   groups/<group>/.lock          advisory group lock
//!   _trash/<group>/<YYYYMMDD-HHMMSS>/<relative-path>   local recycle bin
//!   _remote_trash/<group>/<YYYYMMDD-HHMMSS>/...         copy of the remote bin
//! ```

use std::path::{Path, PathBuf};

use rsyncx_fs::RsyncxPath;

/// Resolves group-scoped storage paths under a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    /// Use an explicit data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The platform data directory (`~/.local/share/rsyncx` on Linux).
    pub fn platform_default() -> Option<Self> {
        dirs::data_dir().map(|d| Self::new(d.join(RsyncxPath::AppDir.as_str())))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one group's state, ledger and lock.
    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.data_dir
            .join(RsyncxPath::GroupsDir.as_str())
            .join(group)
    }

    pub fn state_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(RsyncxPath::StateFile.as_str())
    }

    pub fn deleted_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(RsyncxPath::DeletedFile.as_str())
    }

    pub fn lock_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(RsyncxPath::LockFile.as_str())
    }

    /// Root of the local recycle bin (shared by all groups, partitioned by name).
    pub fn trash_root(&self) -> PathBuf {
        self.data_dir.join(RsyncxPath::TrashDir.as_str())
    }

    /// Root of the local copies of remote bins, refreshed on every pull.
    pub fn remote_trash_root(&self) -> PathBuf {
        self.data_dir.join(RsyncxPath::RemoteTrashDir.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_group_scoped() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.state_path("docs"),
            PathBuf::from("/data/groups/docs/state.json")
        );
        assert_eq!(
            layout.deleted_path("docs"),
            PathBuf::from("/data/groups/docs/deleted.json")
        );
        assert_eq!(layout.lock_path("docs"), PathBuf::from("/data/groups/docs/.lock"));
        assert_eq!(layout.trash_root(), PathBuf::from("/data/_trash"));
        assert_eq!(
            layout.remote_trash_root(),
            PathBuf::from("/data/_remote_trash")
        );
    }
}
