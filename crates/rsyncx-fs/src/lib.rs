//! Filesystem primitives for rsyncx
//!
//! Provides normalized relative paths, crash-safe atomic writes, advisory
//! group locks and content checksums used by the synchronization core.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;

pub use config::ConfigStore;
pub use constants::RsyncxPath;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use lock::GroupLock;
pub use path::{NormalizedPath, expand_home, resolve_dir, validate_path_identifier};
