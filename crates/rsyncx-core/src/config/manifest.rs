//! Manifest parsing for config.toml
//!
//! The manifest describes servers and the groups synchronized with them.
//! Servers are either SSH hosts (reached through `rsync`) or directories on a
//! mounted filesystem; each may name a fallback tried when the primary does
//! not answer.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::Duration;

use rsyncx_fs::{expand_home, resolve_dir};
use serde::{Deserialize, Serialize};

use crate::group::{RemoteLocation, SshTarget, SyncGroup};
use crate::{Error, Result};

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_port() -> u16 {
    22
}

/// The `[settings]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Bound for each reachability probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Bound for acquiring a group lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Where state, ledgers and the local bin live (default: platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Extra exclude patterns on top of the defaults
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            data_dir: None,
            exclude: Vec::new(),
        }
    }
}

impl Settings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// An SSH server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshServer {
    pub host_primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_fallback: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    /// Directory under which each group's `remote_folder` lives
    pub remote_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

/// A server mounted as a local directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryServer {
    pub root_primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_fallback: Option<String>,
}

/// A `[servers.<name>]` entry, discriminated by `transport`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ServerConfig {
    Ssh(SshServer),
    Directory(DirectoryServer),
}

impl ServerConfig {
    /// Primary and optional fallback locations of `folder` on this server.
    fn locations(&self, folder: &str) -> (RemoteLocation, Option<RemoteLocation>) {
        match self {
            Self::Ssh(server) => {
                let root = format!("{}/{}", server.remote_root.trim_end_matches('/'), folder);
                let target = |host: &str| {
                    RemoteLocation::Ssh(SshTarget {
                        host: host.to_string(),
                        port: server.port,
                        user: server.user.clone(),
                        root: root.clone(),
                        identity: server.identity.as_deref().map(expand_home),
                        password_env: server.password_env.clone(),
                    })
                };
                (
                    target(&server.host_primary),
                    server.host_fallback.as_deref().map(target),
                )
            }
            Self::Directory(server) => {
                let dir = |root: &str| RemoteLocation::Directory(expand_home(root).join(folder));
                (
                    dir(&server.root_primary),
                    server.root_fallback.as_deref().map(dir),
                )
            }
        }
    }
}

/// A `[[groups]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub server: String,
    /// Local directory (`~` expanded)
    pub local: String,
    /// Folder under the server root; defaults to the group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_folder: Option<String>,
}

/// Parsed config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl Manifest {
    /// Parse a manifest from TOML content
    ///
    /// ```
    /// use rsyncx_core::config::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [servers.usb]
    /// transport = "directory"
    /// root_primary = "/mnt/usb"
    ///
    /// [[groups]]
    /// name = "docs"
    /// server = "usb"
    /// local = "/home/me/docs"
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.groups[0].name, "docs");
    /// assert_eq!(manifest.settings.probe_timeout_ms, 1000);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Build [`SyncGroup`]s, resolving each group's server.
    ///
    /// # Errors
    ///
    /// Fails on unknown servers, duplicate group names, or names that are not
    /// safe directory names.
    pub fn sync_groups(&self) -> Result<Vec<SyncGroup>> {
        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(self.groups.len());

        for entry in &self.groups {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::Config {
                    message: format!("group '{}' is defined more than once", entry.name),
                });
            }
            let server = self.servers.get(&entry.server).ok_or_else(|| Error::Config {
                message: format!(
                    "group '{}' refers to unknown server '{}'",
                    entry.name, entry.server
                ),
            })?;

            let folder = entry
                .remote_folder
                .as_deref()
                .unwrap_or(&entry.name)
                .trim_matches('/');
            let (primary, fallback) = server.locations(folder);

            let local = resolve_dir(&expand_home(&entry.local));
            let mut group = SyncGroup::new(&entry.name, local, primary)?;
            if let Some(fallback) = fallback {
                group = group.with_fallback(fallback);
            }
            groups.push(group);
        }
        Ok(groups)
    }
}
