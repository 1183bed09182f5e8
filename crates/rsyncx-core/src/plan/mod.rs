//! Synchronization planning
//!
//! Produces per-phase [`Plan`]s from the stored state and current listings.
//! Plans are recomputed every run and never persisted.

mod action;
mod planner;

pub use action::{Phase, Plan, PlanAction, SkipReason, SyncMode};
pub use planner::SyncPlanner;
