//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;

use crate::lock::lock_exclusive_within;
use crate::{Error, Result, RsyncxPath};

/// Tuning knobs for [`write_atomic`].
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// How long to wait for the writer lock before giving up
    pub lock_timeout: Duration,
    /// Whether to fsync the temporary file before renaming it into place
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Path of the sibling lock file guarding writes to `path`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Path of the temporary file used while writing `path`.
///
/// Lives in the same directory so the final rename never crosses devices.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = format!(
        "{}{}.{}.tmp",
        RsyncxPath::TempPrefix,
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    path.with_file_name(name)
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a crash mid-write leaves the previous
/// version intact. Writers are serialized through an advisory lock on a
/// sibling `<name>.lock` file.
pub fn write_atomic(path: impl AsRef<Path>, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.as_ref();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let lock_path = lock_path_for(native_path);
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    lock_exclusive_within(&lock_file, native_path, config.lock_timeout)?;

    let temp_path = temp_path_for(native_path);
    let result = write_then_rename(&temp_path, native_path, content, config.enable_fsync);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    FileExt::unlock(&lock_file).map_err(|_| Error::LockFailed {
        path: native_path.to_path_buf(),
    })?;

    result
}

fn write_then_rename(temp_path: &Path, target: &Path, content: &[u8], fsync: bool) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if fsync {
        temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }
    drop(temp_file);

    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))
}

/// Read text content from a file.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let native_path = path.as_ref();
    fs::read_to_string(native_path).map_err(|e| Error::io(native_path, e))
}

/// Write text content to a file atomically with default robustness settings.
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}
