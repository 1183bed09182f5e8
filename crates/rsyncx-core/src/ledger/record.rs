//! A single deletion event

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side the deletion was observed on.
///
/// `Remote` means the file disappeared remotely and the local copy was
/// archived; `Local` means it disappeared locally and the remote copy was
/// archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Audit entry for a file moved into a recycle bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Path relative to the group root
    pub path: String,
    /// When the file was archived
    pub deleted_at: DateTime<Utc>,
    pub origin: Origin,
    /// Where the archived copy lives (local path or remote location)
    pub trash_path: String,
}

impl DeletionRecord {
    pub fn new(
        path: impl Into<String>,
        origin: Origin,
        trash_path: impl Into<String>,
        deleted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            deleted_at,
            origin,
            trash_path: trash_path.into(),
        }
    }
}
