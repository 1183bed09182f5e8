//! Starter files written by `rsyncx configure`

use std::fs;
use std::path::Path;

use crate::Result;
use crate::filter::DEFAULT_EXCLUDES;

/// Commented starting point for config.toml.
pub const CONFIG_TEMPLATE: &str = r#"# rsyncx configuration

[settings]
# Bound for each reachability probe, in milliseconds
probe_timeout_ms = 1000
# Bound for acquiring a group lock, in milliseconds
lock_timeout_ms = 5000
# Where state, deletion ledgers and the local recycle bin live
# data_dir = "~/.local/share/rsyncx"
# Extra exclude patterns (the filter file next to this config adds more)
exclude = []

# An SSH server, tried on host_primary first, then host_fallback.
[servers.nas]
transport = "ssh"
host_primary = "192.168.1.10"
host_fallback = "nas.example.net"
port = 22
user = "rsyncx"
remote_root = "/volume1/backup"
# identity = "~/.ssh/id_ed25519"
# password_env = "RSYNCX_PASSWORD"

# A directory on a mounted disk or share.
# [servers.usb]
# transport = "directory"
# root_primary = "/mnt/usb/backup"
# root_fallback = "/media/backup"

[[groups]]
name = "demo"
server = "nas"
local = "~/rsyncx_demo"
# remote_folder = "demo"
"#;

/// The filter file content: the default excludes, one rule per line.
pub fn filter_template() -> String {
    let mut out = String::from(
        "# rsyncx exclude filters\n# One rule per line: '- pattern' excludes matching paths.\n",
    );
    for pattern in DEFAULT_EXCLUDES {
        out.push_str("- ");
        out.push_str(pattern);
        out.push('\n');
    }
    out
}

/// Write `content` to `path` unless something already exists there.
///
/// Returns whether the file was created.
pub(crate) fn write_if_absent(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        tracing::debug!("{} exists, leaving it untouched", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| rsyncx_fs::Error::io(parent, e))?;
    }
    rsyncx_fs::io::write_text(path, content)?;
    Ok(true)
}
