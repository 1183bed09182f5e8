//! Per-group record of the last synchronized version of every file
//!
//! Persisted as `<data_dir>/groups/<group>/state.json`:
//!
//! ```json
//! {
//!   "entries": [{ "path": "docs/a.txt", "last_synced": "2024-05-01T10:00:00Z" }],
//!   "last_sync_at": "2024-05-01T10:00:03Z"
//! }
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;

use chrono::{DateTime, Utc};
use rsyncx_fs::{NormalizedPath, RobustnessConfig};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::layout::DataLayout;
use crate::listing::truncate_to_second;

/// Last-known-synchronized timestamps for one group.
///
/// A record whose `last_sync_at` is unset means the group was never synced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRecord {
    entries: BTreeMap<NormalizedPath, DateTime<Utc>>,
    last_sync_at: Option<DateTime<Utc>>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sync has ever completed for this group.
    pub fn is_initialized(&self) -> bool {
        self.last_sync_at.is_some()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_sync_at = Some(truncate_to_second(at));
    }

    pub fn get(&self, path: &NormalizedPath) -> Option<DateTime<Utc>> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Record `path` as synchronized at `synced` (truncated to seconds).
    pub fn record(&mut self, path: NormalizedPath, synced: DateTime<Utc>) {
        self.entries.insert(path, truncate_to_second(synced));
    }

    /// Drop a path that no longer exists on either side.
    pub fn forget(&mut self, path: &NormalizedPath) -> Option<DateTime<Utc>> {
        self.entries.remove(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedPath, &DateTime<Utc>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    entries: Vec<StateEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateEntry {
    path: String,
    last_synced: DateTime<Utc>,
}

impl From<&StateRecord> for StateDocument {
    fn from(record: &StateRecord) -> Self {
        Self {
            entries: record
                .entries
                .iter()
                .map(|(path, ts)| StateEntry {
                    path: path.to_string(),
                    last_synced: *ts,
                })
                .collect(),
            last_sync_at: record.last_sync_at,
        }
    }
}

impl From<StateDocument> for StateRecord {
    fn from(doc: StateDocument) -> Self {
        let mut record = StateRecord::new();
        for entry in doc.entries {
            match NormalizedPath::relative(&entry.path) {
                Ok(path) => record.record(path, entry.last_synced),
                Err(e) => tracing::warn!("Dropping state entry: {}", e),
            }
        }
        record.last_sync_at = doc.last_sync_at.map(truncate_to_second);
        record
    }
}

/// Loads and atomically saves [`StateRecord`]s.
#[derive(Debug, Clone)]
pub struct StateStore {
    layout: DataLayout,
    robustness: RobustnessConfig,
}

impl StateStore {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    /// Load a group's record.
    ///
    /// A missing file is a first sync. An unreadable or corrupt file is
    /// treated the same way, with a warning, since a first sync never
    /// deletes anything.
    pub fn load(&self, group: &str) -> StateRecord {
        let path = self.layout.state_path(group);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state for group '{}', first sync", group);
                return StateRecord::new();
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} is unreadable ({}), treating group '{}' as never synced",
                    path.display(),
                    e,
                    group
                );
                return StateRecord::new();
            }
        };

        match serde_json::from_str::<StateDocument>(&content) {
            Ok(doc) => doc.into(),
            Err(e) => {
                tracing::warn!(
                    "State file {} is corrupt ({}), treating group '{}' as never synced",
                    path.display(),
                    e,
                    group
                );
                StateRecord::new()
            }
        }
    }

    /// Persist a group's record with write-to-temp-then-rename.
    pub fn save(&self, group: &str, record: &StateRecord) -> Result<()> {
        let path = self.layout.state_path(group);
        let content = serde_json::to_string_pretty(&StateDocument::from(record))?;
        rsyncx_fs::io::write_atomic(&path, content.as_bytes(), self.robustness)?;
        tracing::debug!(
            "Saved state for group '{}' ({} entries)",
            group,
            record.len()
        );
        Ok(())
    }
}
