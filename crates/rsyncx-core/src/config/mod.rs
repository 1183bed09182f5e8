//! Configuration loading
//!
//! A single TOML file defines settings, servers and groups:
//!
//! ```toml
//! [settings]
//! probe_timeout_ms = 1000
//!
//! [servers.nas]
//! transport = "ssh"
//! host_primary = "192.168.1.10"
//! host_fallback = "nas.example.net"
//! user = "rsyncx"
//! remote_root = "/volume1/backup"
//!
//! [[groups]]
//! name = "docs"
//! server = "nas"
//! local = "~/docs"
//! ```
//!
//! [`ResolvedConfig`] implements [`GroupRegistry`](crate::GroupRegistry) and
//! builds a configured [`SyncEngine`](crate::SyncEngine).

mod manifest;
mod resolver;
mod template;

pub use manifest::{DirectoryServer, GroupConfig, Manifest, ServerConfig, Settings, SshServer};
pub use resolver::{ConfigPaths, ConfigResolver, ConfigureReport, ResolvedConfig};
pub use template::{CONFIG_TEMPLATE, filter_template};
