//! SyncEngine implementation
//!
//! Coordinates one group at a time: lock, resolve an endpoint, load state,
//! plan and apply the pull phase, refresh the local copy of the remote bin,
//! save, then plan and apply the push phase against the post-pull state, and
//! save again.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rsyncx_fs::{GroupLock, NormalizedPath, RobustnessConfig};

use super::report::SyncReport;
use crate::filter::ExcludeFilter;
use crate::group::{GroupRegistry, SyncGroup};
use crate::layout::DataLayout;
use crate::ledger::{DeletionLedger, DeletionRecord, Origin};
use crate::listing::{FileListing, scan_directory};
use crate::plan::{Plan, PlanAction, SkipReason, SyncMode, SyncPlanner};
use crate::reach::{DEFAULT_PROBE_TIMEOUT, Endpoint, ReachabilityResolver};
use crate::state::{StateRecord, StateStore};
use crate::transfer::{RoutingTransport, TransferContext, TransferExecutor};
use crate::trash::{Partition, TrashManager};
use crate::Result;

/// Default bound for acquiring a group lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncVerb {
    Pull,
    Push,
    /// Pull, then push
    Run,
}

impl SyncVerb {
    fn pulls(self) -> bool {
        matches!(self, Self::Pull | Self::Run)
    }

    fn pushes(self) -> bool {
        matches!(self, Self::Push | Self::Run)
    }
}

/// Dry-run view of both phases.
#[derive(Debug, Clone)]
pub struct SyncPreview {
    pub endpoint: Endpoint,
    pub mode: SyncMode,
    pub pull: Plan,
    /// Computed as if every pull action had succeeded
    pub push: Plan,
}

/// Bookkeeping summary for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub group: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub tracked_files: usize,
}

/// Partitions removed by a purge.
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
    pub local: Vec<Partition>,
    pub remote: Vec<Partition>,
    /// Partitions dropped from the local copy of the remote bin
    pub remote_copy: Vec<Partition>,
    /// Why the remote bin could not be purged, if it could not
    pub remote_error: Option<String>,
}

/// Everything fixed for the duration of one group's run.
struct Session<'a> {
    group: &'a SyncGroup,
    endpoint: Endpoint,
    partition: Partition,
    mode: SyncMode,
}

impl Session<'_> {
    fn ctx<'s>(&'s self, filter: &'s ExcludeFilter) -> TransferContext<'s> {
        TransferContext {
            group: self.group,
            endpoint: &self.endpoint,
            filter,
            partition: &self.partition,
            mode: self.mode,
        }
    }
}

/// Engine for synchronizing groups
pub struct SyncEngine {
    layout: DataLayout,
    state: StateStore,
    ledger: DeletionLedger,
    local_bin: TrashManager,
    remote_bin_copy: TrashManager,
    resolver: ReachabilityResolver,
    transport: Box<dyn TransferExecutor>,
    planner: SyncPlanner,
    filter: ExcludeFilter,
    lock_timeout: Duration,
}

impl SyncEngine {
    /// Engine with default probe and lock bounds, routing transport and only
    /// the reserved exclusions.
    pub fn new(layout: DataLayout) -> Self {
        Self {
            state: StateStore::new(layout.clone()),
            ledger: DeletionLedger::new(layout.clone()),
            local_bin: TrashManager::new(layout.trash_root()),
            remote_bin_copy: TrashManager::new(layout.remote_trash_root()),
            resolver: ReachabilityResolver::new(DEFAULT_PROBE_TIMEOUT),
            transport: Box::new(RoutingTransport::default()),
            planner: SyncPlanner::new(),
            filter: ExcludeFilter::reserved_only(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            layout,
        }
    }

    pub fn with_transport(mut self, transport: Box<dyn TransferExecutor>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_filter(mut self, filter: ExcludeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.resolver = ReachabilityResolver::new(timeout);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        let robustness = RobustnessConfig {
            lock_timeout: timeout,
            ..RobustnessConfig::default()
        };
        self.state = self.state.with_robustness(robustness);
        self.ledger = self.ledger.with_robustness(robustness);
        self
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn filter(&self) -> &ExcludeFilter {
        &self.filter
    }

    fn lock(&self, group: &SyncGroup) -> Result<GroupLock> {
        let lock = GroupLock::acquire(self.layout.lock_path(&group.name), self.lock_timeout)?;
        tracing::debug!("Locked group '{}'", group.name);
        Ok(lock)
    }

    fn open_session<'a>(&self, group: &'a SyncGroup, mode: SyncMode) -> Result<Session<'a>> {
        let endpoint = self.resolver.resolve(group)?;
        Ok(Session {
            group,
            endpoint,
            partition: Partition::now(),
            mode,
        })
    }

    /// Create the local root, and on a first sync the remote root too.
    fn prepare_roots(&self, session: &Session<'_>) -> Result<()> {
        let group = session.group;
        std::fs::create_dir_all(&group.local_root)
            .map_err(|e| rsyncx_fs::Error::io(&group.local_root, e))?;
        if session.mode == SyncMode::FirstSync {
            self.transport.ensure_root(&session.ctx(&self.filter))?;
        }
        Ok(())
    }

    /// Refresh the local copy of the group's remote bin. Failures are logged
    /// only; the copy never takes part in planning.
    fn copy_remote_bin(&self, session: &Session<'_>) {
        let destination = self.remote_bin_copy.group_dir(&session.group.name);
        if let Err(e) = self
            .transport
            .fetch_bin(&session.ctx(&self.filter), &destination)
        {
            tracing::warn!(
                "Could not copy remote bin of '{}': {}",
                session.group.name,
                e
            );
        }
    }

    fn list_both(&self, session: &Session<'_>) -> Result<(FileListing, FileListing)> {
        let local = scan_directory(&session.group.local_root, &self.filter)?;
        let remote = self.transport.list(&session.ctx(&self.filter))?;
        Ok((local, remote))
    }

    /// Preview both phases without changing anything.
    pub fn plan(&self, group: &SyncGroup) -> Result<SyncPreview> {
        let prior = self.state.load(&group.name);
        let mode = SyncMode::for_state(&prior);
        let session = self.open_session(group, mode)?;
        let (local, remote) = self.list_both(&session)?;

        let pull = self.planner.plan_pull(mode, &prior, local, remote);

        let mut post_pull = prior.clone();
        let mut local_after = pull.local().clone();
        for action in pull.actions() {
            pull.commit(action, &mut post_pull);
            match action {
                PlanAction::Pull(path) => {
                    if let Some(meta) = pull.remote().get(path) {
                        local_after.insert(path.clone(), *meta);
                    }
                }
                PlanAction::TrashLocal(path) => {
                    local_after.remove(path);
                }
                _ => {}
            }
        }

        let push = self.planner.plan_push(
            mode,
            &prior,
            &post_pull,
            &pull.handled_paths(),
            local_after,
            pull.remote().clone(),
        );

        Ok(SyncPreview {
            endpoint: session.endpoint,
            mode,
            pull,
            push,
        })
    }

    /// Apply a single-phase plan computed earlier (e.g. by [`SyncEngine::plan`]).
    ///
    /// Only actions that succeed are committed to the state.
    pub fn apply(&self, group: &SyncGroup, plan: &Plan) -> Result<SyncReport> {
        let _lock = self.lock(group)?;
        let session = self.open_session(group, plan.mode)?;
        let mut state = self.state.load(&group.name);

        let mut report = SyncReport::new(&group.name);
        report.mode = Some(plan.mode);
        report.endpoint = Some(session.endpoint.clone());

        self.prepare_roots(&session)?;
        self.apply_phase(&session, plan, &mut state, &mut report);
        state.mark_synced(Utc::now());
        self.state.save(&group.name, &state)?;
        Ok(report)
    }

    pub fn pull(&self, group: &SyncGroup) -> Result<SyncReport> {
        self.sync(group, SyncVerb::Pull)
    }

    pub fn push(&self, group: &SyncGroup) -> Result<SyncReport> {
        self.sync(group, SyncVerb::Push)
    }

    /// Pull then push, with the pull committed before the push is planned.
    pub fn run(&self, group: &SyncGroup) -> Result<SyncReport> {
        self.sync(group, SyncVerb::Run)
    }

    /// Execute `verb` for one group under its lock.
    pub fn sync(&self, group: &SyncGroup, verb: SyncVerb) -> Result<SyncReport> {
        let _lock = self.lock(group)?;
        let prior = self.state.load(&group.name);
        let mode = SyncMode::for_state(&prior);
        let session = self.open_session(group, mode)?;
        let mut state = prior.clone();
        tracing::info!("Group '{}': {} ({:?})", group.name, mode, verb);

        let mut report = SyncReport::new(&group.name);
        report.mode = Some(mode);
        report.endpoint = Some(session.endpoint.clone());

        self.prepare_roots(&session)?;
        let mut handled = BTreeSet::new();

        if verb.pulls() {
            let (local, remote) = self.list_both(&session)?;
            let plan = self.planner.plan_pull(mode, &state, local, remote);
            self.apply_phase(&session, &plan, &mut state, &mut report);
            self.copy_remote_bin(&session);
            state.mark_synced(Utc::now());
            self.state.save(&group.name, &state)?;
            handled = plan.handled_paths();
        }

        if verb.pushes() {
            let (local, remote) = self.list_both(&session)?;
            let plan = self
                .planner
                .plan_push(mode, &prior, &state, &handled, local, remote);
            self.apply_phase(&session, &plan, &mut state, &mut report);
            state.mark_synced(Utc::now());
            self.state.save(&group.name, &state)?;
        }

        tracing::info!(
            "Group '{}' done: {} changed, {} skipped, {} failed",
            group.name,
            report.changed(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Run `verb` for every group, continuing past per-group failures.
    pub fn sync_all(
        &self,
        registry: &dyn GroupRegistry,
        verb: SyncVerb,
    ) -> Vec<(String, Result<SyncReport>)> {
        registry
            .list_groups()
            .into_iter()
            .map(|group| {
                let result = self.sync(&group, verb);
                if let Err(e) = &result {
                    tracing::warn!("Group '{}' aborted: {}", group.name, e);
                }
                (group.name, result)
            })
            .collect()
    }

    fn apply_phase(
        &self,
        session: &Session<'_>,
        plan: &Plan,
        state: &mut StateRecord,
        report: &mut SyncReport,
    ) {
        tracing::info!(
            "{} phase for '{}': {} actions",
            plan.phase,
            session.group.name,
            plan.effective().count()
        );

        let mut remote_actions = Vec::new();
        for action in plan.actions() {
            match action {
                PlanAction::Skip(path, reason) => {
                    if *reason != SkipReason::InSync {
                        tracing::debug!("Skipping {}: {}", path, reason);
                    }
                    plan.commit(action, state);
                    report.record_success(action);
                }
                PlanAction::TrashLocal(path) => {
                    match self.trash_local(session, path) {
                        Ok(()) => {
                            plan.commit(action, state);
                            report.record_success(action);
                        }
                        Err(e) => {
                            tracing::warn!("Could not archive local {}: {}", path, e);
                            report.record_failure(action, e.to_string());
                        }
                    }
                }
                other => remote_actions.push(other.clone()),
            }
        }

        if remote_actions.is_empty() {
            return;
        }

        let ctx = session.ctx(&self.filter);
        for outcome in self.transport.apply(&ctx, &remote_actions) {
            let action = &outcome.action;
            if let Some(error) = &outcome.error {
                report.record_failure(action, error.clone());
                continue;
            }

            if let PlanAction::TrashRemote(path) = action {
                let record = DeletionRecord::new(
                    path.as_str(),
                    Origin::Local,
                    outcome.trash_path.clone().unwrap_or_default(),
                    Utc::now(),
                );
                if let Err(e) = self.ledger.append(&session.group.name, record) {
                    tracing::warn!("Archived remote {} but ledger append failed: {}", path, e);
                    report.record_failure(action, e.to_string());
                    continue;
                }
            }

            plan.commit(action, state);
            report.record_success(action);
        }
    }

    fn trash_local(&self, session: &Session<'_>, path: &NormalizedPath) -> Result<()> {
        let entry = self.local_bin.trash(
            &session.group.name,
            &session.group.local_root,
            path,
            Origin::Remote,
            &session.partition,
        )?;
        self.ledger.append(
            &session.group.name,
            DeletionRecord::new(
                path.as_str(),
                Origin::Remote,
                entry.location.display().to_string(),
                Utc::now(),
            ),
        )
    }

    /// Last sync time and tracked file count, from the stored state only.
    pub fn status(&self, group: &str) -> GroupStatus {
        let record = self.state.load(group);
        GroupStatus {
            group: group.to_string(),
            last_sync_at: record.last_sync_at(),
            tracked_files: record.len(),
        }
    }

    /// The deletion ledger of a group.
    pub fn deletions(&self, group: &str) -> Result<Vec<DeletionRecord>> {
        self.ledger.read(group)
    }

    /// Empty a group's bins: the local one and the local copy of the remote
    /// bin always, the remote one when an endpoint answers. Never part of a
    /// sync.
    pub fn purge(
        &self,
        group: &SyncGroup,
        older_than: Option<DateTime<Utc>>,
    ) -> Result<PurgeReport> {
        let _lock = self.lock(group)?;
        let mut report = PurgeReport {
            local: self.local_bin.purge(&group.name, older_than)?,
            remote_copy: self.remote_bin_copy.purge(&group.name, older_than)?,
            ..PurgeReport::default()
        };

        let mode = SyncMode::for_state(&self.state.load(&group.name));
        let remote = self
            .open_session(group, mode)
            .and_then(|session| self.transport.purge(&session.ctx(&self.filter), older_than));
        match remote {
            Ok(removed) => report.remote = removed,
            Err(e) => {
                tracing::warn!("Remote bin of '{}' not purged: {}", group.name, e);
                report.remote_error = Some(e.to_string());
            }
        }
        Ok(report)
    }
}
