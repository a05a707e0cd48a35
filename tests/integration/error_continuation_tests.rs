use linkdupe::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use linkdupe::report::{ReportBuilder, RunMode};
use linkdupe::scanner::{AttributeSnapshot, FileRecord, ReadError};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn phantom(path: &str, size: u64) -> FileRecord {
    FileRecord::new(
        PathBuf::from(path),
        AttributeSnapshot {
            size,
            mode: 0o644,
            uid: 1000,
            gid: 1000,
            mtime_secs: 1_700_000_000,
            mtime_nanos: 0,
        },
    )
}

#[test]
fn test_find_duplicates_from_records_continues_on_error() {
    let finder = DuplicateFinder::with_defaults();
    let records = vec![
        phantom("nonexistent_1.txt", 100),
        phantom("nonexistent_2.txt", 100),
    ];

    let (sets, summary) = finder.find_duplicates_from_records(records).unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.read_errors.len(), 2);
    for err in &summary.read_errors {
        match err {
            ReadError::NotFound(_) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }
}

#[test]
fn test_unreadable_member_does_not_hide_other_duplicates() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"good content").unwrap();
    fs::write(&b, b"good content").unwrap();
    let mtime = filetime::FileTime::from_unix_time(1_700_000_000, 0);
    filetime::set_file_mtime(&a, mtime).unwrap();
    filetime::set_file_mtime(&b, mtime).unwrap();

    let good_a = FileRecord::from_path(&a).unwrap();
    let good_b = FileRecord::from_path(&b).unwrap();
    let gone = phantom("vanished.txt", good_a.size);

    let finder = DuplicateFinder::with_defaults();
    let (sets, summary) = finder
        .find_duplicates_from_records(vec![good_a, gone, good_b])
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
    assert_eq!(summary.read_errors.len(), 1);
    assert_eq!(summary.read_errors[0].path(), PathBuf::from("vanished.txt"));
}

#[test]
fn test_modified_since_walk_is_reported() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"before").unwrap();
    fs::write(&b, b"before").unwrap();

    let stale_a = FileRecord::from_path(&a).unwrap();
    let stale_b = FileRecord::from_path(&b).unwrap();
    fs::write(&b, b"after!").unwrap();
    filetime::set_file_mtime(&b, filetime::FileTime::from_unix_time(1_500_000_000, 0)).unwrap();

    let finder = DuplicateFinder::with_defaults();
    let (sets, summary) = finder
        .find_duplicates_from_records(vec![stale_a, stale_b])
        .unwrap();

    assert!(sets.is_empty());
    assert!(summary
        .read_errors
        .iter()
        .any(|e| matches!(e, ReadError::Modified(p) if p == &b)));
}

#[test]
fn test_errors_flow_into_report() {
    let finder = DuplicateFinder::with_defaults();
    let records = vec![phantom("missing_a", 10), phantom("missing_b", 10)];
    let (sets, summary) = finder.find_duplicates_from_records(records).unwrap();

    let plan = linkdupe::actions::LinkPlan::for_sets(&sets);
    let outcome = linkdupe::actions::LinkOutcome::default();
    let report = ReportBuilder::new(RunMode::DryRun, &sets, &plan, &outcome)
        .with_summary(&summary)
        .build();

    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped.iter().all(|s| s.stage == "hash"));
    assert!(report.has_errors());
}

#[test]
fn test_shutdown_before_scan_interrupts() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"data").unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(flag));

    match finder.run(&[dir.path().to_path_buf()], RunMode::Apply) {
        Err(FinderError::Interrupted) => {}
        other => panic!("Expected Interrupted, got {:?}", other.map(|r| r.report)),
    }
}

#[cfg(unix)]
#[test]
fn test_permission_denied_directory_continues() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden_copy"), b"dup").unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();
    let mtime = filetime::FileTime::from_unix_time(1_700_000_000, 0);
    filetime::set_file_mtime(dir.path().join("a"), mtime).unwrap();
    filetime::set_file_mtime(dir.path().join("b"), mtime).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores directory permissions; nothing to observe then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let finder = DuplicateFinder::with_defaults();
    let result = finder.find_duplicates(&[dir.path().to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (sets, summary) = result.unwrap();
    assert_eq!(sets.len(), 1);
    assert!(!summary.access_errors.is_empty());
}
