//! Append-only log of every file moved into a recycle bin
//!
//! The ledger is for audit and recovery only; the planner never reads it.
//! Persisted as `<data_dir>/groups/<group>/deleted.json`:
//!
//! ```json
//! { "deletions": [{ "path": "a.txt", "deleted_at": "...", "origin": "remote", "trash_path": "..." }] }
//! ```

mod record;

pub use record::{DeletionRecord, Origin};

use std::io::ErrorKind;

use rsyncx_fs::RobustnessConfig;
use serde::{Deserialize, Serialize};

use crate::layout::DataLayout;
use crate::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    deletions: Vec<DeletionRecord>,
}

/// Per-group deletion ledger.
///
/// There is no update or removal operation. An unparseable file is never
/// rewritten, so history cannot shrink.
#[derive(Debug, Clone)]
pub struct DeletionLedger {
    layout: DataLayout,
    robustness: RobustnessConfig,
}

impl DeletionLedger {
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

    /// All entries for a group, oldest first. A missing file is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerCorrupt`] if the file exists but cannot be parsed.
    pub fn read(&self, group: &str) -> Result<Vec<DeletionRecord>> {
        let path = self.layout.deleted_path(group);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(rsyncx_fs::Error::io(&path, e).into()),
        };

        let doc: LedgerDocument =
            serde_json::from_str(&content).map_err(|e| Error::LedgerCorrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(doc.deletions)
    }

    /// Append exactly one entry.
    ///
    /// Read-modify-write through an atomic replace; callers serialize access
    /// by holding the group lock.
    pub fn append(&self, group: &str, record: DeletionRecord) -> Result<()> {
        let mut deletions = self.read(group)?;
        tracing::debug!(
            "Ledger '{}': {} deleted ({} side) -> {}",
            group,
            record.path,
            record.origin,
            record.trash_path
        );
        deletions.push(record);

        let content = serde_json::to_string_pretty(&LedgerDocument { deletions })?;
        rsyncx_fs::io::write_atomic(
            self.layout.deleted_path(group),
            content.as_bytes(),
            self.robustness,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(path: &str, origin: Origin) -> DeletionRecord {
        DeletionRecord::new(
            path,
            origin,
            format!("/bin/{}", path),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn missing_ledger_reads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = DeletionLedger::new(DataLayout::new(dir.path()));
        assert!(ledger.read("docs").unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let ledger = DeletionLedger::new(DataLayout::new(dir.path()));

        ledger.append("docs", record("a.txt", Origin::Remote)).unwrap();
        ledger.append("docs", record("b.txt", Origin::Local)).unwrap();
        ledger.append("docs", record("a.txt", Origin::Local)).unwrap();

        let entries = ledger.read("docs").unwrap();
        let summary: Vec<(&str, Origin)> =
            entries.iter().map(|r| (r.path.as_str(), r.origin)).collect();
        assert_eq!(
            summary,
            vec![
                ("a.txt", Origin::Remote),
                ("b.txt", Origin::Local),
                ("a.txt", Origin::Local)
            ]
        );
    }

    #[test]
    fn groups_are_isolated() {
        let dir = TempDir::new().unwrap();
        let ledger = DeletionLedger::new(DataLayout::new(dir.path()));
        ledger.append("docs", record("a.txt", Origin::Remote)).unwrap();
        assert!(ledger.read("photos").unwrap().is_empty());
    }

    #[test]
    fn origin_serializes_lowercase() {
        let json = serde_json::to_value(record("a.txt", Origin::Remote)).unwrap();
        assert_eq!(json["origin"], "remote");
    }

    #[test]
    fn corrupt_ledger_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.group_dir("docs")).unwrap();
        std::fs::write(layout.deleted_path("docs"), "garbage").unwrap();

        let ledger = DeletionLedger::new(layout.clone());
        let err = ledger
            .append("docs", record("a.txt", Origin::Local))
            .unwrap_err();
        assert!(matches!(err, Error::LedgerCorrupt { .. }));
        assert_eq!(
            std::fs::read_to_string(layout.deleted_path("docs")).unwrap(),
            "garbage"
        );
    }
}
