//! Two-phase decision engine
//!
//! The pull phase reconciles remote changes and remote deletions into the
//! local tree. The push phase runs after the pull has been applied and the
//! state saved, and reconciles local changes and local deletions into the
//! remote tree. Timestamps compare at one-second resolution.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rsyncx_fs::NormalizedPath;

use super::action::{Phase, Plan, PlanAction, SkipReason, SyncMode};
use crate::listing::FileListing;
use crate::state::StateRecord;

/// Stateless planner; every input is passed explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncPlanner;

impl SyncPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Phase 1: decide what to take from the remote side.
    pub fn plan_pull(
        &self,
        mode: SyncMode,
        state: &StateRecord,
        local: FileListing,
        remote: FileListing,
    ) -> Plan {
        let paths: BTreeSet<&NormalizedPath> = remote.paths().chain(state.paths()).collect();
        let mut actions = Vec::new();

        for path in paths {
            let stored = state.get(path);
            let action = match (remote.get(path), local.get(path), stored) {
                (Some(r), local_meta, stored) => {
                    if stored.is_some_and(|s| r.mtime <= s) {
                        continue;
                    }
                    match local_meta {
                        None => Some(PlanAction::Pull(path.clone())),
                        Some(l) if stored.is_some_and(|s| l.mtime <= s) => {
                            Some(PlanAction::Pull(path.clone()))
                        }
                        Some(l) => match r.mtime.cmp(&l.mtime) {
                            Ordering::Greater => Some(PlanAction::Pull(path.clone())),
                            Ordering::Less => {
                                tracing::debug!("{}: local edit is newer, left to push", path);
                                None
                            }
                            Ordering::Equal if r.size == l.size => {
                                Some(PlanAction::Skip(path.clone(), SkipReason::InSync))
                            }
                            Ordering::Equal => {
                                Some(PlanAction::Skip(path.clone(), SkipReason::AmbiguousConflict))
                            }
                        },
                    }
                }
                (None, Some(l), Some(s)) => match mode {
                    SyncMode::FirstSync => None,
                    SyncMode::Incremental if l.mtime <= s => {
                        Some(PlanAction::TrashLocal(path.clone()))
                    }
                    SyncMode::Incremental => {
                        Some(PlanAction::Skip(path.clone(), SkipReason::EditedAfterDeletion))
                    }
                },
                (None, None, Some(_)) => Some(PlanAction::Skip(path.clone(), SkipReason::Vanished)),
                (None, _, None) => None,
            };

            if let Some(action) = action {
                tracing::debug!("pull phase: {}", action);
                actions.push(action);
            }
        }

        Plan::new(Phase::Pull, mode, actions, local, remote)
    }

    /// Phase 2: decide what to send to the remote side.
    ///
    /// `state` is the record after the pull phase was committed, `prior` the
    /// one loaded at the start of the run. `handled` holds paths the pull
    /// phase already settled (see [`Plan::handled_paths`]).
    pub fn plan_push(
        &self,
        mode: SyncMode,
        prior: &StateRecord,
        state: &StateRecord,
        handled: &BTreeSet<NormalizedPath>,
        local: FileListing,
        remote: FileListing,
    ) -> Plan {
        let paths: BTreeSet<&NormalizedPath> = local
            .paths()
            .chain(state.paths())
            .filter(|p| !handled.contains(*p))
            .collect();
        let mut actions = Vec::new();

        for path in paths {
            let stored = state.get(path);
            let action = match (local.get(path), remote.get(path), stored) {
                (Some(l), remote_meta, stored) => {
                    if stored.is_some_and(|s| l.mtime <= s) {
                        continue;
                    }
                    match remote_meta {
                        None => Some(PlanAction::Push(path.clone())),
                        Some(r) => match r.mtime.cmp(&l.mtime) {
                            Ordering::Less => Some(PlanAction::Push(path.clone())),
                            Ordering::Greater => {
                                Some(PlanAction::Skip(path.clone(), SkipReason::RemoteNewer))
                            }
                            Ordering::Equal if r.size == l.size => {
                                Some(PlanAction::Skip(path.clone(), SkipReason::InSync))
                            }
                            Ordering::Equal => {
                                Some(PlanAction::Skip(path.clone(), SkipReason::AmbiguousConflict))
                            }
                        },
                    }
                }
                (None, None, Some(_)) => Some(PlanAction::Skip(path.clone(), SkipReason::Vanished)),
                (None, Some(_), Some(_)) if !prior.contains(path) => {
                    Some(PlanAction::Skip(path.clone(), SkipReason::NotBaselined))
                }
                (None, Some(r), Some(s)) => match mode {
                    SyncMode::FirstSync => None,
                    SyncMode::Incremental if r.mtime <= s => {
                        Some(PlanAction::TrashRemote(path.clone()))
                    }
                    SyncMode::Incremental => {
                        Some(PlanAction::Skip(path.clone(), SkipReason::EditedAfterDeletion))
                    }
                },
                (None, _, None) => None,
            };

            if let Some(action) = action {
                tracing::debug!("push phase: {}", action);
                actions.push(action);
            }
        }

        Plan::new(Phase::Push, mode, actions, local, remote)
    }
}
