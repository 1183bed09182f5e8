//! Timestamp-named bin partitions

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

const FORMAT: &str = "%Y%m%d-%H%M%S";

/// One `YYYYMMDD-HHMMSS` directory in a recycle bin (UTC).
///
/// A run computes its partition once, so every file archived by that run
/// lands in the same directory and retries of the run are idempotent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Partition(String);

impl Partition {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.format(FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Parse an existing directory name; `None` for anything not produced by [`Partition::at`].
    pub fn parse(name: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(name, FORMAT)
            .ok()
            .map(|naive| Self::at(naive.and_utc()))
            .filter(|p| p.0 == name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant this partition was created.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
