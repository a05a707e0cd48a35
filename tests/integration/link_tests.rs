use linkdupe::actions::{HardlinkTransaction, LinkPlan, PlannedAction};
use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use linkdupe::report::{MemberAction, RunMode};
use linkdupe::scanner::{FileIdentity, FileRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_with_mtime(path: &Path, content: &[u8]) {
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
}

/// `a` and `b` hold the same 100 bytes, `c` holds 100 different ones.
fn abc_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write_with_mtime(&dir.path().join("a"), &[b'x'; 100]);
    write_with_mtime(&dir.path().join("b"), &[b'x'; 100]);
    write_with_mtime(&dir.path().join("c"), &[b'y'; 100]);
    dir
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2))
}

#[cfg(unix)]
fn inode(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().ino()
}

#[test]
fn test_dry_run_reports_without_changing_files() {
    let dir = abc_tree();
    let roots = vec![dir.path().to_path_buf()];

    let run = finder().run(&roots, RunMode::DryRun).unwrap();

    assert_eq!(run.report.duplicate_sets, 1);
    assert_eq!(run.report.files_involved, 2);
    assert_eq!(run.report.planned_links, 1);
    assert_eq!(run.report.projected_savings, 100);
    assert_eq!(run.report.applied_links, 0);
    assert_eq!(run.report.realized_savings, 0);
    assert!(run.sets[0].members().all(|m| !m.path.ends_with("c")));

    #[cfg(unix)]
    assert_ne!(inode(&dir.path().join("a")), inode(&dir.path().join("b")));
}

#[cfg(unix)]
#[test]
fn test_apply_links_redundant_to_canonical() {
    let dir = abc_tree();
    let roots = vec![dir.path().to_path_buf()];
    let c_inode = inode(&dir.path().join("c"));

    let run = finder().run(&roots, RunMode::Apply).unwrap();

    assert_eq!(run.report.files_involved, 2);
    assert_eq!(run.report.applied_links, 1);
    assert_eq!(run.report.realized_savings, 100);
    assert!(run.report.link_errors.is_empty());
    assert_eq!(inode(&dir.path().join("a")), inode(&dir.path().join("b")));
    assert_eq!(inode(&dir.path().join("c")), c_inode);
    assert_eq!(fs::read(dir.path().join("b")).unwrap(), vec![b'x'; 100]);

    // No staging names are left behind.
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".linkdupe-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn test_second_apply_is_idempotent() {
    let dir = abc_tree();
    let roots = vec![dir.path().to_path_buf()];

    let first = finder().run(&roots, RunMode::Apply).unwrap();
    assert_eq!(first.report.applied_links, 1);

    let second = finder().run(&roots, RunMode::Apply).unwrap();
    assert_eq!(second.report.duplicate_sets, 1);
    assert_eq!(second.report.files_involved, 2);
    assert_eq!(second.report.planned_links, 0);
    assert_eq!(second.report.already_linked, 1);
    assert_eq!(second.report.applied_links, 0);
    assert_eq!(second.report.realized_savings, 0);
    assert_eq!(second.report.sets[0].members[1].action, MemberAction::AlreadyLinked);
}

#[cfg(unix)]
#[test]
fn test_existing_hardlink_pair_is_reported_as_already_linked() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    write_with_mtime(&a, b"linked before the run");
    fs::hard_link(&a, dir.path().join("b")).unwrap();

    let run = finder()
        .run(&[dir.path().to_path_buf()], RunMode::DryRun)
        .unwrap();

    assert_eq!(run.report.duplicate_sets, 1);
    assert_eq!(run.report.files_involved, 2);
    assert_eq!(run.report.already_linked, 1);
    assert_eq!(run.report.planned_links, 0);
    assert_eq!(run.report.projected_savings, 0);
}

#[test]
fn test_dry_run_and_apply_agree_on_sets() {
    let dry_dir = abc_tree();
    let apply_dir = abc_tree();

    let dry = finder()
        .run(&[dry_dir.path().to_path_buf()], RunMode::DryRun)
        .unwrap();
    let applied = finder()
        .run(&[apply_dir.path().to_path_buf()], RunMode::Apply)
        .unwrap();

    assert_eq!(dry.report.duplicate_sets, applied.report.duplicate_sets);
    assert_eq!(dry.report.planned_links, applied.report.planned_links);
    assert_eq!(dry.report.projected_savings, applied.report.projected_savings);
    assert_eq!(dry.sets[0].fingerprint, applied.sets[0].fingerprint);
    assert_eq!(
        dry.sets[0].canonical.path.file_name(),
        applied.sets[0].canonical.path.file_name()
    );
}

#[cfg(unix)]
#[test]
fn test_existing_hardlink_is_canonical_and_not_relinked() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("zz_original");
    write_with_mtime(&original, b"shared hardlink content");
    fs::hard_link(&original, dir.path().join("zz_second")).unwrap();
    write_with_mtime(&dir.path().join("a_copy"), b"shared hardlink content");
    let shared = inode(&original);

    let run = finder()
        .run(&[dir.path().to_path_buf()], RunMode::Apply)
        .unwrap();

    assert_eq!(run.sets.len(), 1);
    // Two in-set links beat the shorter name.
    assert!(run.sets[0].canonical.path.ends_with("zz_original"));
    assert_eq!(run.plan.count(PlannedAction::AlreadyLinked), 1);
    assert_eq!(run.report.applied_links, 1);
    assert_eq!(run.report.realized_savings, 23);
    assert_eq!(inode(&dir.path().join("a_copy")), shared);
    assert_eq!(inode(&dir.path().join("zz_second")), shared);
}

#[test]
fn test_cross_device_member_is_reported_not_linked() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    write_with_mtime(&a, b"device split content");
    write_with_mtime(&b, b"device split content");

    let records: Vec<FileRecord> = vec![
        FileRecord::from_path(&a)
            .unwrap()
            .with_identity(FileIdentity::new(1, 10)),
        FileRecord::from_path(&b)
            .unwrap()
            .with_identity(FileIdentity::new(2, 20)),
    ];

    let (sets, _) = finder().find_duplicates_from_records(records).unwrap();
    assert_eq!(sets.len(), 1);

    let plan = LinkPlan::for_sets(&sets);
    assert_eq!(plan.count(PlannedAction::CrossDevice), 1);
    assert_eq!(plan.planned_links(), 0);

    let transaction = HardlinkTransaction::new(&sets, &plan);
    let dry = transaction.dry_run();
    let applied = transaction.apply();

    for outcome in [&dry, &applied] {
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].error.is_cross_device());
    }
    assert_eq!(fs::read(&b).unwrap(), b"device split content");
}

#[test]
fn test_canonical_chosen_on_device_holding_most_copies() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b1 = dir.path().join("b1");
    let b2 = dir.path().join("b2");
    for path in [&a, &b1, &b2] {
        write_with_mtime(path, b"spread over two devices");
    }

    let records: Vec<FileRecord> = vec![
        FileRecord::from_path(&a)
            .unwrap()
            .with_identity(FileIdentity::new(1, 10)),
        FileRecord::from_path(&b1)
            .unwrap()
            .with_identity(FileIdentity::new(2, 20)),
        FileRecord::from_path(&b2)
            .unwrap()
            .with_identity(FileIdentity::new(2, 21)),
    ];

    let (sets, _) = finder().find_duplicates_from_records(records).unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].canonical.path, b1);

    let plan = LinkPlan::for_sets(&sets);
    assert_eq!(plan.planned_links(), 1);
    assert_eq!(plan.count(PlannedAction::CrossDevice), 1);

    let dry = HardlinkTransaction::new(&sets, &plan).dry_run();
    assert_eq!(dry.applied, 0);
    assert_eq!(dry.failures.len(), 1);
    assert_eq!(dry.failures[0].redundant, a);
    assert!(dry.failures[0].error.is_cross_device());
}

#[test]
fn test_report_members_carry_actions() {
    let dir = abc_tree();
    let run = finder()
        .run(&[dir.path().to_path_buf()], RunMode::DryRun)
        .unwrap();

    let set = &run.report.sets[0];
    assert_eq!(set.size, 100);
    assert_eq!(set.members.len(), 2);
    assert_eq!(set.members[0].action, MemberAction::Keep);
    assert_eq!(set.members[1].action, MemberAction::Link);
    assert_eq!(set.canonical, set.members[0].path);
}

#[cfg(unix)]
#[test]
fn test_file_modified_after_scan_is_not_replaced() {
    let dir = abc_tree();
    let roots: Vec<PathBuf> = vec![dir.path().to_path_buf()];
    let (sets, _) = finder().find_duplicates(&roots).unwrap();
    let plan = LinkPlan::for_sets(&sets);

    let redundant = sets[0].redundant[0].path.clone();
    fs::write(&redundant, b"rewritten after the scan").unwrap();

    let outcome = HardlinkTransaction::new(&sets, &plan).apply();

    assert_eq!(outcome.applied, 0);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(fs::read(&redundant).unwrap(), b"rewritten after the scan");
}
