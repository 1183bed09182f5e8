//! Running plans against real trees
//!
//! [`SyncEngine`] ties the state store, ledger, bins, resolver, planner and
//! transport together for one group at a time.

mod engine;
mod report;

pub use engine::{
    DEFAULT_LOCK_TIMEOUT, GroupStatus, PurgeReport, SyncEngine, SyncPreview, SyncVerb,
};
pub use report::{ActionFailure, SyncReport};
