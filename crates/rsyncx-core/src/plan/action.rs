//! Plan actions and the plan container

use std::collections::BTreeSet;
use std::fmt;

use rsyncx_fs::NormalizedPath;

use crate::listing::FileListing;
use crate::state::StateRecord;

/// Why a path was looked at but left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Both sides hold the same version; the baseline is adopted
    InSync,
    /// Both sides changed to the same second with different content
    AmbiguousConflict,
    /// Deleted on one side but edited on the other since the last sync
    EditedAfterDeletion,
    /// The remote copy is newer than the local edit; the next pull takes it
    RemoteNewer,
    /// Gone from both sides; the state entry is dropped
    Vanished,
    /// Not part of the state at the start of the run, so never deleted
    NotBaselined,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InSync => "in sync",
            Self::AmbiguousConflict => "ambiguous conflict (same timestamp, different size)",
            Self::EditedAfterDeletion => "edited after deletion",
            Self::RemoteNewer => "remote is newer",
            Self::Vanished => "deleted on both sides",
            Self::NotBaselined => "not in previous state",
        };
        f.write_str(text)
    }
}

/// One decision for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Pull(NormalizedPath),
    Push(NormalizedPath),
    TrashLocal(NormalizedPath),
    TrashRemote(NormalizedPath),
    Skip(NormalizedPath, SkipReason),
}

impl PlanAction {
    pub fn path(&self) -> &NormalizedPath {
        match self {
            Self::Pull(p) | Self::Push(p) | Self::TrashLocal(p) | Self::TrashRemote(p) => p,
            Self::Skip(p, _) => p,
        }
    }

    /// Whether the action deletes anything (on either side).
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::TrashLocal(_) | Self::TrashRemote(_))
    }

    /// Whether the action needs the transfer executor.
    pub fn is_remote_operation(&self) -> bool {
        matches!(self, Self::Pull(_) | Self::Push(_) | Self::TrashRemote(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pull(_) => "pull",
            Self::Push(_) => "push",
            Self::TrashLocal(_) => "trash-local",
            Self::TrashRemote(_) => "trash-remote",
            Self::Skip(..) => "skip",
        }
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip(p, reason) => write!(f, "skip {} ({})", p, reason),
            other => write!(f, "{} {}", other.label(), other.path()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pull,
    Push,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// How deletions are treated for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No prior state: deletion detection is suppressed
    FirstSync,
    /// Prior state exists: deletions are propagated into the bins
    Incremental,
}

impl SyncMode {
    /// Decided once per run from the state loaded at its start.
    pub fn for_state(prior: &StateRecord) -> Self {
        if prior.is_initialized() {
            Self::Incremental
        } else {
            Self::FirstSync
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSync => write!(f, "first sync"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

/// Ordered actions for one phase, plus the listings they were computed from.
#[derive(Debug, Clone)]
pub struct Plan {
    pub phase: Phase,
    pub mode: SyncMode,
    actions: Vec<PlanAction>,
    local: FileListing,
    remote: FileListing,
}

impl Plan {
    pub fn new(
        phase: Phase,
        mode: SyncMode,
        actions: Vec<PlanAction>,
        local: FileListing,
        remote: FileListing,
    ) -> Self {
        Self {
            phase,
            mode,
            actions,
            local,
            remote,
        }
    }

    pub fn actions(&self) -> &[PlanAction] {
        &self.actions
    }

    pub fn local(&self) -> &FileListing {
        &self.local
    }

    pub fn remote(&self) -> &FileListing {
        &self.remote
    }

    /// Actions that change something on disk (everything but skips).
    pub fn effective(&self) -> impl Iterator<Item = &PlanAction> {
        self.actions
            .iter()
            .filter(|a| !matches!(a, PlanAction::Skip(..)))
    }

    pub fn is_empty(&self) -> bool {
        self.effective().next().is_none()
    }

    /// Paths the push phase must leave alone after this pull plan.
    pub fn handled_paths(&self) -> BTreeSet<NormalizedPath> {
        self.actions
            .iter()
            .filter(|a| {
                matches!(
                    a,
                    PlanAction::TrashLocal(_)
                        | PlanAction::Skip(_, SkipReason::AmbiguousConflict)
                )
            })
            .map(|a| a.path().clone())
            .collect()
    }

    /// Record a completed action in `state`.
    ///
    /// Transfers store the version that was copied; deletions and vanished
    /// paths are forgotten; an in-sync observation adopts the common mtime.
    pub fn commit(&self, action: &PlanAction, state: &mut StateRecord) {
        match action {
            PlanAction::Pull(path) => {
                if let Some(meta) = self.remote.get(path) {
                    state.record(path.clone(), meta.mtime);
                }
            }
            PlanAction::Push(path) | PlanAction::Skip(path, SkipReason::InSync) => {
                if let Some(meta) = self.local.get(path) {
                    state.record(path.clone(), meta.mtime);
                }
            }
            PlanAction::TrashLocal(path)
            | PlanAction::TrashRemote(path)
            | PlanAction::Skip(path, SkipReason::Vanished) => {
                state.forget(path);
            }
            PlanAction::Skip(..) => {}
        }
    }
}
