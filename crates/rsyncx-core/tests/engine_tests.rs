//! End-to-end engine runs against a directory remote.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use rsyncx_core::{
    ActionOutcome, DirectoryTransport, Error, FileListing, Origin, Partition, PlanAction,
    RemoteLocation, SyncGroup, SyncMode, SyncVerb, TransferContext, TransferExecutor,
};
use rsyncx_fs::{GroupLock, NormalizedPath};
use rsyncx_test_utils::SyncFixture;

#[test]
fn scenario_a_first_sync_downloads_remote_files() {
    let fixture = SyncFixture::with_group("docs");
    fixture.write_remote("a.txt", "a", 1);
    fixture.write_remote("b.txt", "b", 2);
    fixture.write_remote("sub/c.txt", "c", 3);

    let laptop = fixture.machine("laptop");
    let report = laptop.run();

    assert_eq!(report.mode, Some(SyncMode::FirstSync));
    assert_eq!(report.pulled.len(), 3);
    assert!(report.pushed.is_empty());
    assert_eq!(laptop.files(), vec!["a.txt", "b.txt", "sub/c.txt"]);

    let status = laptop.engine().status("docs");
    assert_eq!(status.tracked_files, 3);
    assert!(status.last_sync_at.is_some());
}

#[test]
fn scenario_b_remote_deletion_archives_local_copy() {
    let fixture = SyncFixture::with_group("photos");
    fixture.write_remote("img.png", "pixels", 5);
    let laptop = fixture.machine("laptop");
    laptop.run();

    fixture.remove_remote("img.png");
    let report = laptop.run();

    assert_eq!(report.trashed_local, vec![NormalizedPath::from("img.png")]);
    assert!(laptop.read("img.png").is_none());
    assert_eq!(laptop.trash(), vec!["img.png"]);

    let ledger = laptop.engine().deletions("photos").unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].path, "img.png");
    assert_eq!(ledger[0].origin, Origin::Remote);
    assert_eq!(laptop.engine().status("photos").tracked_files, 0);
}

#[test]
fn scenario_c_local_deletion_archives_remote_copy() {
    let fixture = SyncFixture::new();
    fixture.write_remote("notes.txt", "todo", 5);
    let laptop = fixture.machine("laptop");
    laptop.run();

    laptop.remove("notes.txt");
    let report = laptop.run();

    assert_eq!(report.trashed_remote, vec![NormalizedPath::from("notes.txt")]);
    assert!(fixture.remote_files().is_empty());
    assert_eq!(fixture.remote_trash(), vec!["notes.txt"]);

    let ledger = laptop.engine().deletions("docs").unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].origin, Origin::Local);
}

#[test]
fn scenario_d_unreachable_group_does_not_stop_others() {
    let fixture = SyncFixture::new();
    fixture.write_remote("ok.txt", "fine", 1);
    let laptop = fixture.machine("laptop");

    let offline = SyncGroup::new(
        "offline",
        fixture.root().join("offline-local"),
        RemoteLocation::Directory(fixture.root().join("unmounted-a").join("offline")),
    )
    .unwrap()
    .with_fallback(RemoteLocation::Directory(
        fixture.root().join("unmounted-b").join("offline"),
    ));

    let groups = vec![offline, laptop.group()];
    let results = laptop.engine().sync_all(&groups, SyncVerb::Run);

    assert_eq!(results.len(), 2);
    match &results[0] {
        (name, Err(Error::Unreachable { tried, .. })) => {
            assert_eq!(name, "offline");
            assert_eq!(tried.len(), 2);
        }
        other => panic!("expected unreachable, got {:?}", other.1.as_ref().map(|r| r.changed())),
    }
    assert!(results[1].1.as_ref().unwrap().is_success());
    assert_eq!(laptop.read("ok.txt").as_deref(), Some("fine"));
    assert_eq!(laptop.engine().status("offline").last_sync_at, None);
}

#[test]
fn fallback_endpoint_is_used_when_primary_is_down() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");

    let group = SyncGroup::new(
        "docs",
        laptop.local(),
        RemoteLocation::Directory(fixture.root().join("unmounted").join("docs")),
    )
    .unwrap()
    .with_fallback(RemoteLocation::Directory(fixture.remote()));

    let report = laptop.engine().run(&group).unwrap();
    assert_eq!(report.pulled.len(), 1);
    assert_eq!(
        report.endpoint.unwrap().role,
        rsyncx_core::EndpointRole::Fallback
    );
}

#[test]
fn first_sync_merges_without_deleting() {
    let fixture = SyncFixture::new();
    fixture.write_remote("remote-only.txt", "r", 1);
    let laptop = fixture.machine("laptop");
    laptop.write("local-only.txt", "l", 1);

    let report = laptop.run();

    assert!(report.trashed_local.is_empty());
    assert!(report.trashed_remote.is_empty());
    assert_eq!(laptop.files(), vec!["local-only.txt", "remote-only.txt"]);
    assert_eq!(fixture.remote_files(), vec!["local-only.txt", "remote-only.txt"]);
}

#[test]
fn second_run_changes_nothing() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");
    laptop.write("b.txt", "b", 2);
    laptop.run();

    let again = laptop.run();
    assert_eq!(again.changed(), 0);

    let preview = laptop.engine().plan(&laptop.group()).unwrap();
    assert!(preview.pull.is_empty());
    assert!(preview.push.is_empty());
}

#[test]
fn plan_does_not_touch_anything() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");
    laptop.write("b.txt", "b", 2);

    let preview = laptop.engine().plan(&laptop.group()).unwrap();

    assert_eq!(preview.mode, SyncMode::FirstSync);
    assert_eq!(preview.pull.actions(), &[PlanAction::Pull("a.txt".into())]);
    assert_eq!(preview.push.actions(), &[PlanAction::Push("b.txt".into())]);
    assert_eq!(laptop.files(), vec!["b.txt"]);
    assert_eq!(fixture.remote_files(), vec!["a.txt"]);
    assert_eq!(laptop.engine().status("docs").last_sync_at, None);
}

#[test]
fn previewed_plan_can_be_applied() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");
    let engine = laptop.engine();

    let preview = engine.plan(&laptop.group()).unwrap();
    let report = engine.apply(&laptop.group(), &preview.pull).unwrap();

    assert_eq!(report.pulled, vec![NormalizedPath::from("a.txt")]);
    assert_eq!(laptop.read("a.txt").as_deref(), Some("a"));
    assert_eq!(engine.status("docs").tracked_files, 1);
}

#[test]
fn vanished_remote_root_aborts_instead_of_archiving() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    fixture.write_remote("c/d.txt", "d", 2);
    let laptop = fixture.machine("laptop");
    laptop.run();

    std::fs::remove_dir_all(fixture.remote()).unwrap();
    let result = laptop.engine().run(&laptop.group());

    assert!(matches!(result, Err(Error::RemoteRootMissing { .. })));
    assert_eq!(laptop.files(), vec!["a.txt", "c/d.txt"]);
    assert!(laptop.trash().is_empty());
    assert!(laptop.engine().deletions("docs").unwrap().is_empty());
    assert_eq!(laptop.engine().status("docs").tracked_files, 2);
}

#[test]
fn new_group_folder_is_created_on_first_sync() {
    let fixture = SyncFixture::new();
    let laptop = fixture.machine("laptop");
    laptop.write("a.txt", "a", 1);
    let disk = fixture.root().join("usb");
    std::fs::create_dir_all(&disk).unwrap();

    let group = SyncGroup::new(
        "docs",
        laptop.local(),
        RemoteLocation::Directory(disk.join("docs")),
    )
    .unwrap();
    let report = laptop.engine().run(&group).unwrap();

    assert_eq!(report.pushed, vec![NormalizedPath::from("a.txt")]);
    assert!(disk.join("docs/a.txt").is_file());

    // Even with nothing to push, the folder exists for the next run.
    let empty = fixture.machine("desktop");
    let group = SyncGroup::new(
        "notes",
        empty.local(),
        RemoteLocation::Directory(disk.join("notes")),
    )
    .unwrap();
    empty.engine().run(&group).unwrap();
    assert!(disk.join("notes").is_dir());
    assert_eq!(empty.engine().run(&group).unwrap().changed(), 0);
}

#[test]
fn failed_local_archive_keeps_file_and_state() {
    let fixture = SyncFixture::with_group("photos");
    fixture.write_remote("img.png", "pixels", 5);
    let laptop = fixture.machine("laptop");
    laptop.run();

    std::fs::write(laptop.layout().trash_root(), "not a directory").unwrap();
    fixture.remove_remote("img.png");
    let report = laptop.run();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].action,
        PlanAction::TrashLocal("img.png".into())
    );
    assert!(report.trashed_local.is_empty());
    assert!(report.pushed.is_empty());
    assert_eq!(laptop.files(), vec!["img.png"]);
    assert!(fixture.remote_files().is_empty());
    assert!(laptop.engine().deletions("photos").unwrap().is_empty());
    assert_eq!(laptop.engine().status("photos").tracked_files, 1);
}

#[test]
fn remote_bin_is_copied_locally_on_pull() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    fixture.write_remote("b.txt", "b", 2);
    let laptop = fixture.machine("laptop");
    laptop.run();

    laptop.remove("a.txt");
    laptop.run();
    assert_eq!(fixture.remote_trash(), vec!["a.txt"]);

    let report = laptop.pull();
    assert_eq!(report.changed(), 0);
    assert_eq!(laptop.remote_trash_copy(), vec!["a.txt"]);
    assert_eq!(laptop.files(), vec!["b.txt"]);
    assert!(laptop.trash().is_empty());

    // The copy is never planned as content.
    let preview = laptop.engine().plan(&laptop.group()).unwrap();
    assert!(preview.pull.is_empty());
    assert!(preview.push.is_empty());

    let purged = laptop.engine().purge(&laptop.group(), None).unwrap();
    assert_eq!(purged.remote_copy.len(), 1);
    assert!(laptop.remote_trash_copy().is_empty());
}

#[test]
fn pull_only_leaves_local_changes_for_later() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");
    laptop.run();

    laptop.write("new.txt", "n", 10);
    let report = laptop.pull();
    assert!(report.pushed.is_empty());
    assert!(fixture.read_remote("new.txt").is_none());

    let report = laptop.push();
    assert_eq!(report.pushed, vec![NormalizedPath::from("new.txt")]);
    assert_eq!(fixture.read_remote("new.txt").as_deref(), Some("n"));
}

#[test]
fn modification_times_survive_transfer() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 42);
    let laptop = fixture.machine("laptop");
    laptop.run();

    let remote = std::fs::metadata(fixture.remote().join("a.txt"))
        .unwrap()
        .modified()
        .unwrap();
    let local = std::fs::metadata(laptop.local().join("a.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(
        DateTime::<Utc>::from(remote).timestamp(),
        DateTime::<Utc>::from(local).timestamp()
    );
}

#[test]
fn ledger_only_grows() {
    let fixture = SyncFixture::new();
    fixture.write_remote("one.txt", "1", 1);
    fixture.write_remote("two.txt", "2", 1);
    let laptop = fixture.machine("laptop");
    laptop.run();

    fixture.remove_remote("one.txt");
    laptop.run();
    let first = laptop.engine().deletions("docs").unwrap();

    laptop.remove("two.txt");
    laptop.run();
    let second = laptop.engine().deletions("docs").unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(second[0], first[0]);
}

#[test]
fn same_path_deleted_twice_is_archived_twice() {
    let fixture = SyncFixture::new();
    fixture.write_remote("cycle.txt", "v1", 1);
    let laptop = fixture.machine("laptop");
    laptop.run();

    fixture.remove_remote("cycle.txt");
    laptop.run();
    fixture.write_remote("cycle.txt", "v2", 50);
    laptop.run();
    assert_eq!(laptop.read("cycle.txt").as_deref(), Some("v2"));

    fixture.remove_remote("cycle.txt");
    laptop.run();

    let ledger = laptop.engine().deletions("docs").unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.iter().all(|r| r.path == "cycle.txt"));
    assert_eq!(laptop.trash().len(), 2);
}

#[test]
fn held_lock_fails_cleanly() {
    let fixture = SyncFixture::new();
    let laptop = fixture.machine("laptop");
    let _held = GroupLock::acquire(laptop.layout().lock_path("docs"), Duration::from_secs(1))
        .unwrap();

    let engine = laptop
        .engine()
        .with_lock_timeout(Duration::from_millis(100));
    let result = engine.run(&laptop.group());

    assert!(matches!(
        result,
        Err(Error::Fs(rsyncx_fs::Error::LockFailed { .. }))
    ));
    assert_eq!(engine.status("docs").last_sync_at, None);
}

#[test]
fn excluded_files_are_never_transferred() {
    let fixture = SyncFixture::new();
    fixture.write_remote(".DS_Store", "junk", 1);
    fixture.write_remote("keep.txt", "k", 1);
    let laptop = fixture.machine("laptop");
    laptop.write("build.tmp", "t", 1);

    let filter = rsyncx_core::ExcludeFilter::with_defaults(["*.tmp"]).unwrap();
    let engine = laptop.engine().with_filter(filter);
    engine.run(&laptop.group()).unwrap();

    assert_eq!(laptop.files(), vec!["build.tmp", "keep.txt"]);
    assert_eq!(fixture.remote_files(), vec![".DS_Store", "keep.txt"]);
}

/// Directory transport that refuses to push one path.
struct FlakyPush {
    inner: DirectoryTransport,
    broken: &'static str,
}

impl TransferExecutor for FlakyPush {
    fn list(&self, ctx: &TransferContext<'_>) -> rsyncx_core::Result<FileListing> {
        self.inner.list(ctx)
    }

    fn ensure_root(&self, ctx: &TransferContext<'_>) -> rsyncx_core::Result<()> {
        self.inner.ensure_root(ctx)
    }

    fn fetch_bin(&self, ctx: &TransferContext<'_>, destination: &Path) -> rsyncx_core::Result<()> {
        self.inner.fetch_bin(ctx, destination)
    }

    fn apply(&self, ctx: &TransferContext<'_>, actions: &[PlanAction]) -> Vec<ActionOutcome> {
        let (broken, rest): (Vec<_>, Vec<_>) = actions
            .iter()
            .cloned()
            .partition(|a| matches!(a, PlanAction::Push(p) if p.as_str() == self.broken));
        let mut outcomes = self.inner.apply(ctx, &rest);
        outcomes.extend(
            broken
                .into_iter()
                .map(|a| ActionOutcome::failed(a, "connection reset")),
        );
        outcomes
    }

    fn purge(
        &self,
        ctx: &TransferContext<'_>,
        older_than: Option<DateTime<Utc>>,
    ) -> rsyncx_core::Result<Vec<Partition>> {
        self.inner.purge(ctx, older_than)
    }
}

#[test]
fn failed_actions_are_retried_next_run() {
    let fixture = SyncFixture::new();
    let laptop = fixture.machine("laptop");
    laptop.write("good.txt", "g", 1);
    laptop.write("bad.txt", "b", 1);

    let flaky = laptop.engine().with_transport(Box::new(FlakyPush {
        inner: DirectoryTransport::new(),
        broken: "bad.txt",
    }));
    let report = flaky.run(&laptop.group()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.pushed, vec![NormalizedPath::from("good.txt")]);
    assert_eq!(flaky.status("docs").tracked_files, 1);

    let retry = laptop.run();
    assert_eq!(retry.pushed, vec![NormalizedPath::from("bad.txt")]);
    assert!(retry.trashed_local.is_empty());
    assert_eq!(fixture.remote_files(), vec!["bad.txt", "good.txt"]);
}

#[test]
fn purge_empties_both_bins() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    fixture.write_remote("b.txt", "b", 1);
    let laptop = fixture.machine("laptop");
    laptop.run();

    fixture.remove_remote("a.txt");
    laptop.remove("b.txt");
    laptop.run();
    assert_eq!(laptop.trash(), vec!["a.txt"]);
    assert_eq!(fixture.remote_trash(), vec!["b.txt"]);

    let report = laptop.engine().purge(&laptop.group(), None).unwrap();
    assert_eq!(report.local.len(), 1);
    assert_eq!(report.remote.len(), 1);
    assert!(report.remote_error.is_none());
    assert!(laptop.trash().is_empty());
    assert!(fixture.remote_trash().is_empty());
    // The audit trail outlives the bin.
    assert_eq!(laptop.engine().deletions("docs").unwrap().len(), 2);
}

#[test]
fn purge_of_unreachable_group_still_empties_local_bin() {
    let fixture = SyncFixture::new();
    fixture.write_remote("a.txt", "a", 1);
    let laptop = fixture.machine("laptop");
    laptop.run();
    fixture.remove_remote("a.txt");
    laptop.run();

    let offline = SyncGroup::new(
        "docs",
        laptop.local(),
        RemoteLocation::Directory(PathBuf::from("/nonexistent/rsyncx-remote")),
    )
    .unwrap();
    let report = laptop.engine().purge(&offline, None).unwrap();

    assert_eq!(report.local.len(), 1);
    assert!(report.remote_error.is_some());
}
