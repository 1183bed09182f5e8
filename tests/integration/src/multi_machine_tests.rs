//! Several machines sharing one remote
//!
//! Each machine has its own local tree and data directory (state, ledger,
//! local bin); they only meet through the remote directory. These scenarios
//! check that edits and deletions travel between machines and that nothing is
//! ever destroyed on the way.

use pretty_assertions::assert_eq;
use rsyncx_core::{Origin, SkipReason, SyncMode};
use rsyncx_fs::NormalizedPath;
use rsyncx_test_utils::{Machine, SyncFixture};

/// Two machines that have both completed a first sync of `files`.
fn synced_pair(fixture: &SyncFixture, files: &[&str]) -> (Machine, Machine) {
    for (i, file) in files.iter().enumerate() {
        fixture.write_remote(file, &format!("v1 {}", file), i as u64 + 1);
    }
    let laptop = fixture.machine("laptop");
    let desktop = fixture.machine("desktop");
    laptop.run();
    desktop.run();
    (laptop, desktop)
}

// =============================================================================
// Deletion propagation
// =============================================================================

#[test]
fn deletion_travels_from_one_machine_to_the_other() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["keep.txt", "drop.txt"]);

    laptop.remove("drop.txt");
    let report = laptop.run();
    assert_eq!(report.trashed_remote, vec![NormalizedPath::from("drop.txt")]);
    assert_eq!(fixture.remote_trash(), vec!["drop.txt"]);

    let report = desktop.run();
    assert_eq!(report.trashed_local, vec![NormalizedPath::from("drop.txt")]);
    assert_eq!(desktop.files(), vec!["keep.txt"]);
    assert_eq!(desktop.trash(), vec!["drop.txt"]);

    // Every copy that disappeared is still in some bin.
    assert_eq!(laptop.trash(), Vec::<String>::new());
    assert_eq!(fixture.remote_trash(), vec!["drop.txt"]);

    let laptop_ledger = laptop.engine().deletions("docs").unwrap();
    let desktop_ledger = desktop.engine().deletions("docs").unwrap();
    assert_eq!(laptop_ledger.len(), 1);
    assert_eq!(laptop_ledger[0].origin, Origin::Local);
    assert_eq!(desktop_ledger.len(), 1);
    assert_eq!(desktop_ledger[0].origin, Origin::Remote);
}

#[test]
fn deleted_directory_contents_propagate() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) =
        synced_pair(&fixture, &["project/a.rs", "project/src/b.rs", "other.txt"]);

    laptop.remove("project/a.rs");
    laptop.remove("project/src/b.rs");
    laptop.run();
    desktop.run();

    assert_eq!(fixture.remote_files(), vec!["other.txt"]);
    assert_eq!(desktop.files(), vec!["other.txt"]);
    assert_eq!(desktop.trash(), vec!["project/a.rs", "project/src/b.rs"]);
}

#[test]
fn deletion_on_both_machines_is_archived_once() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["gone.txt"]);

    laptop.remove("gone.txt");
    desktop.remove("gone.txt");
    laptop.run();
    let report = desktop.run();

    assert!(report.trashed_local.is_empty());
    assert!(report.trashed_remote.is_empty());
    assert!(
        report
            .skipped
            .contains(&("gone.txt".into(), SkipReason::Vanished))
    );
    assert_eq!(fixture.remote_trash(), vec!["gone.txt"]);
    assert_eq!(desktop.engine().status("docs").tracked_files, 0);
}

// =============================================================================
// Edits racing deletions
// =============================================================================

#[test]
fn edit_pushed_before_remote_sees_deletion_survives() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["draft.md"]);

    laptop.write("draft.md", "v2 edited", 100);
    laptop.run();

    desktop.remove("draft.md");
    let report = desktop.run();

    assert_eq!(report.pulled, vec![NormalizedPath::from("draft.md")]);
    assert!(report.trashed_remote.is_empty());
    assert_eq!(desktop.read("draft.md").as_deref(), Some("v2 edited"));
    assert!(fixture.remote_trash().is_empty());
}

#[test]
fn local_edit_after_remote_deletion_is_restored_remotely() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["draft.md"]);

    desktop.remove("draft.md");
    desktop.run();
    assert_eq!(fixture.remote_trash(), vec!["draft.md"]);

    laptop.write("draft.md", "v2 edited", 100);
    let report = laptop.run();

    assert!(report.trashed_local.is_empty());
    assert_eq!(report.pushed, vec![NormalizedPath::from("draft.md")]);
    assert_eq!(fixture.read_remote("draft.md").as_deref(), Some("v2 edited"));

    // The desktop picks the restored file up again.
    desktop.run();
    assert_eq!(desktop.read("draft.md").as_deref(), Some("v2 edited"));
}

// =============================================================================
// Edits
// =============================================================================

#[test]
fn later_edit_wins_across_machines() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["shared.txt"]);

    laptop.write("shared.txt", "laptop", 50);
    desktop.write("shared.txt", "desktop", 60);
    laptop.run();
    desktop.run();
    laptop.run();

    assert_eq!(fixture.read_remote("shared.txt").as_deref(), Some("desktop"));
    assert_eq!(laptop.read("shared.txt").as_deref(), Some("desktop"));
    assert!(laptop.trash().is_empty());
    assert!(desktop.trash().is_empty());
}

#[test]
fn machines_converge_after_a_round_of_runs() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["a.txt", "b.txt", "c.txt"]);

    laptop.write("laptop-new.txt", "l", 70);
    laptop.remove("a.txt");
    desktop.write("desktop-new.txt", "d", 80);
    desktop.write("b.txt", "b edited", 90);

    laptop.run();
    desktop.run();
    laptop.run();

    let expected = vec!["b.txt", "c.txt", "desktop-new.txt", "laptop-new.txt"];
    assert_eq!(laptop.files(), expected);
    assert_eq!(desktop.files(), expected);
    assert_eq!(fixture.remote_files(), expected);
    assert_eq!(laptop.read("b.txt").as_deref(), Some("b edited"));

    assert_eq!(laptop.run().changed(), 0);
    assert_eq!(desktop.run().changed(), 0);
}

// =============================================================================
// Joining machines
// =============================================================================

#[test]
fn new_machine_merges_instead_of_deleting() {
    let fixture = SyncFixture::new();
    let (laptop, _desktop) = synced_pair(&fixture, &["a.txt"]);

    let tablet = fixture.machine("tablet");
    tablet.write("stale.txt", "only here", 5);
    let report = tablet.run();

    assert_eq!(report.mode, Some(SyncMode::FirstSync));
    assert_eq!(report.pulled, vec![NormalizedPath::from("a.txt")]);
    assert_eq!(report.pushed, vec![NormalizedPath::from("stale.txt")]);
    assert!(fixture.remote_trash().is_empty());

    laptop.run();
    assert_eq!(laptop.files(), vec!["a.txt", "stale.txt"]);
}

#[test]
fn machine_with_lost_state_does_not_delete() {
    let fixture = SyncFixture::new();
    let (laptop, desktop) = synced_pair(&fixture, &["a.txt", "b.txt"]);

    laptop.remove("a.txt");
    laptop.run();

    // The desktop's bookkeeping is wiped; its next run is a first sync.
    std::fs::remove_dir_all(desktop.data()).unwrap();
    let report = desktop.run();

    assert_eq!(report.mode, Some(SyncMode::FirstSync));
    assert!(report.trashed_local.is_empty());
    assert_eq!(report.pushed, vec![NormalizedPath::from("a.txt")]);
    assert_eq!(fixture.remote_files(), vec!["a.txt", "b.txt"]);
}
