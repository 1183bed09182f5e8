//! Advisory file locks with bounded acquisition
//!
//! Locks are fs2 (flock-style) exclusive locks. Acquisition retries with
//! exponential backoff until the configured timeout elapses, so a second
//! invocation against the same group fails cleanly instead of hanging.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, Result};

/// Try to take an exclusive lock on `file`, retrying until `timeout`.
pub(crate) fn lock_exclusive_within(file: &File, path: &Path, timeout: Duration) -> Result<()> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(250))
        .with_max_elapsed_time(Some(timeout))
        .build();

    backoff::retry(policy, || {
        file.try_lock_exclusive()
            .map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })
}

/// An exclusive advisory lock held for the lifetime of the value.
///
/// Used to serialize `load/plan/apply/save` for one group across processes.
#[derive(Debug)]
pub struct GroupLock {
    file: File,
    path: PathBuf,
}

impl GroupLock {
    /// Acquire the lock file at `path`, creating it (and its parents) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockFailed`] if another holder keeps the lock past
    /// `timeout`.
    pub fn acquire(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        lock_exclusive_within(&file, path, timeout)?;
        tracing::debug!(path = %path.display(), "Acquired group lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for GroupLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), "Failed to release group lock: {}", e);
        }
    }
}
