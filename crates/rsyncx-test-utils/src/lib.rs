//! Shared test utilities for the rsyncx workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixture`]: [`SyncFixture`] with one shared remote directory and any
//!   number of simulated machines syncing against it

pub mod fixture;

pub use fixture::{Machine, SyncFixture, set_mtime};
