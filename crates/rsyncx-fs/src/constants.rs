//! Well-known file and directory names used by rsyncx.

use std::path::Path;

/// Fixed names for configuration, group storage and the recycle bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsyncxPath {
    /// Application directory under the platform config/data dirs
    AppDir,
    /// The main configuration file
    ConfigFile,
    /// Optional rsync-style exclude filter file
    FilterFile,
    /// Directory holding one subdirectory per group
    GroupsDir,
    /// Per-group synchronization state
    StateFile,
    /// Per-group deletion ledger
    DeletedFile,
    /// Per-group advisory lock file
    LockFile,
    /// Recycle bin directory (local data dir and remote root)
    TrashDir,
    /// Local copy of remote recycle bins, one subdirectory per group
    RemoteTrashDir,
    /// Prefix of temporary files created during atomic writes and copies
    TempPrefix,
}

impl RsyncxPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppDir => "rsyncx",
            Self::ConfigFile => "config.toml",
            Self::FilterFile => "filter",
            Self::GroupsDir => "groups",
            Self::StateFile => "state.json",
            Self::DeletedFile => "deleted.json",
            Self::LockFile => ".lock",
            Self::TrashDir => "_trash",
            Self::RemoteTrashDir => "_remote_trash",
            Self::TempPrefix => ".rsyncx-",
        }
    }
}

impl AsRef<Path> for RsyncxPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for RsyncxPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for RsyncxPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
