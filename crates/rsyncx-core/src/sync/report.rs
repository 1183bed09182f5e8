//! Outcome of synchronizing one group

use rsyncx_fs::NormalizedPath;

use crate::plan::{PlanAction, SkipReason, SyncMode};
use crate::reach::Endpoint;

/// An action that was attempted and failed; its state entry was not advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub action: PlanAction,
    pub message: String,
}

/// Report from a pull, push or run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub group: String,
    pub mode: Option<SyncMode>,
    pub endpoint: Option<Endpoint>,
    pub pulled: Vec<NormalizedPath>,
    pub pushed: Vec<NormalizedPath>,
    /// Local copies archived because the file was deleted remotely
    pub trashed_local: Vec<NormalizedPath>,
    /// Remote copies archived because the file was deleted locally
    pub trashed_remote: Vec<NormalizedPath>,
    pub skipped: Vec<(NormalizedPath, SkipReason)>,
    pub failures: Vec<ActionFailure>,
}

impl SyncReport {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }

    /// Whether every attempted action succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of paths that changed on either side.
    pub fn changed(&self) -> usize {
        self.pulled.len() + self.pushed.len() + self.trashed_local.len() + self.trashed_remote.len()
    }

    pub fn record_success(&mut self, action: &PlanAction) {
        match action {
            PlanAction::Pull(p) => self.pulled.push(p.clone()),
            PlanAction::Push(p) => self.pushed.push(p.clone()),
            PlanAction::TrashLocal(p) => self.trashed_local.push(p.clone()),
            PlanAction::TrashRemote(p) => self.trashed_remote.push(p.clone()),
            PlanAction::Skip(p, reason) => self.skipped.push((p.clone(), *reason)),
        }
    }

    pub fn record_failure(&mut self, action: &PlanAction, message: impl Into<String>) {
        self.failures.push(ActionFailure {
            action: action.clone(),
            message: message.into(),
        });
    }

    /// Human-readable lines, one per non-skip action.
    pub fn action_lines(&self) -> Vec<String> {
        let lines = self
            .pulled
            .iter()
            .map(|p| format!("pulled {}", p))
            .chain(self.pushed.iter().map(|p| format!("pushed {}", p)))
            .chain(
                self.trashed_local
                    .iter()
                    .map(|p| format!("archived local copy of {}", p)),
            )
            .chain(
                self.trashed_remote
                    .iter()
                    .map(|p| format!("archived remote copy of {}", p)),
            );
        lines.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_make_report_unsuccessful() {
        let mut report = SyncReport::new("docs");
        report.record_success(&PlanAction::Pull("a".into()));
        assert!(report.is_success());
        report.record_failure(&PlanAction::Push("b".into()), "boom");
        assert!(!report.is_success());
        assert_eq!(report.changed(), 1);
        assert_eq!(report.action_lines(), vec!["pulled a"]);
    }
}
