//! Sync group definitions and the registry interface that supplies them

use std::fmt;
use std::path::PathBuf;

use rsyncx_fs::validate_path_identifier;

use crate::{Error, Result};

/// An SSH-reachable remote root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Absolute POSIX path of the group's folder on the server
    pub root: String,
    /// Private key passed to `ssh -i`
    pub identity: Option<PathBuf>,
    /// Name of an environment variable holding the SSH password (via `sshpass -e`)
    pub password_env: Option<String>,
}

/// Where the remote copy of a group lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLocation {
    /// A directory reachable through the local filesystem (mounted share, USB disk)
    Directory(PathBuf),
    /// A folder on an SSH server, transferred with rsync
    Ssh(SshTarget),
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(path) => write!(f, "{}", path.display()),
            Self::Ssh(target) => write!(
                f,
                "{}@{}:{}{}",
                target.user, target.host, target.port, target.root
            ),
        }
    }
}

/// A named local directory paired with its remote counterpart.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroup {
    pub name: String,
    pub local_root: PathBuf,
    pub remote_primary: RemoteLocation,
    pub remote_fallback: Option<RemoteLocation>,
}

impl SyncGroup {
    /// Create a group, validating that its name is usable as a directory name.
    pub fn new(
        name: impl Into<String>,
        local_root: impl Into<PathBuf>,
        remote_primary: RemoteLocation,
    ) -> Result<Self> {
        let name = name.into();
        validate_path_identifier(&name, "Group name").map_err(|reason| Error::InvalidGroup {
            name: name.clone(),
            reason,
        })?;

        Ok(Self {
            name,
            local_root: local_root.into(),
            remote_primary,
            remote_fallback: None,
        })
    }

    /// Attach a fallback endpoint tried when the primary is unreachable.
    pub fn with_fallback(mut self, fallback: RemoteLocation) -> Self {
        self.remote_fallback = Some(fallback);
        self
    }

    /// Endpoints in the order they should be probed.
    pub fn endpoints(&self) -> impl Iterator<Item = &RemoteLocation> {
        std::iter::once(&self.remote_primary).chain(self.remote_fallback.as_ref())
    }
}

/// Source of group definitions.
///
/// The planner receives a registry explicitly instead of reading process-wide
/// configuration.
pub trait GroupRegistry {
    /// All configured groups, in configuration order.
    fn list_groups(&self) -> Vec<SyncGroup>;

    /// Look up a single group by name.
    fn find_group(&self, name: &str) -> Result<SyncGroup> {
        self.list_groups()
            .into_iter()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::GroupNotFound {
                name: name.to_string(),
            })
    }
}

impl GroupRegistry for Vec<SyncGroup> {
    fn list_groups(&self) -> Vec<SyncGroup> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str) -> RemoteLocation {
        RemoteLocation::Directory(PathBuf::from(path))
    }

    #[test]
    fn group_name_is_validated() {
        assert!(SyncGroup::new("docs", "/tmp/docs", dir("/mnt/a")).is_ok());
        let err = SyncGroup::new("../etc", "/tmp/x", dir("/mnt/a")).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup { .. }));
    }

    #[test]
    fn endpoints_list_primary_then_fallback() {
        let group = SyncGroup::new("docs", "/tmp/docs", dir("/mnt/a"))
            .unwrap()
            .with_fallback(dir("/mnt/b"));
        let order: Vec<String> = group.endpoints().map(|e| e.to_string()).collect();
        assert_eq!(order, vec!["/mnt/a", "/mnt/b"]);
    }

    #[test]
    fn vec_registry_finds_groups() {
        let groups = vec![
            SyncGroup::new("docs", "/tmp/docs", dir("/mnt/a")).unwrap(),
            SyncGroup::new("photos", "/tmp/photos", dir("/mnt/b")).unwrap(),
        ];
        assert_eq!(groups.find_group("photos").unwrap().name, "photos");
        assert!(matches!(
            groups.find_group("music"),
            Err(Error::GroupNotFound { .. })
        ));
    }

    #[test]
    fn ssh_location_display() {
        let loc = RemoteLocation::Ssh(SshTarget {
            host: "nas".into(),
            port: 22,
            user: "me".into(),
            root: "/volume1/docs".into(),
            identity: None,
            password_env: None,
        });
        assert_eq!(loc.to_string(), "me@nas:22/volume1/docs");
    }
}
