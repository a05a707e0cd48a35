use linkdupe::duplicates::{DuplicateFinder, FinderError};
use linkdupe::error::FatalConfigError;
use linkdupe::report::RunMode;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_with_mtime(path: &Path, content: &[u8]) {
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
}

#[test]
fn test_duplicates_across_roots() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    write_with_mtime(&dir1.path().join("left.bin"), b"cross root content");
    write_with_mtime(&dir2.path().join("right.bin"), b"cross root content");

    let finder = DuplicateFinder::with_defaults();
    let roots = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
    let (sets, summary) = finder.find_duplicates(&roots).unwrap();

    assert_eq!(summary.roots_scanned, 2);
    assert_eq!(summary.total_files, 2);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
}

#[test]
fn test_overlapping_roots_count_files_once() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    write_with_mtime(&dir.path().join("top.bin"), b"overlap content");
    write_with_mtime(&sub.join("inner.bin"), b"overlap content");

    let finder = DuplicateFinder::with_defaults();
    let roots = vec![sub.clone(), dir.path().to_path_buf(), dir.path().to_path_buf()];
    let (sets, summary) = finder.find_duplicates(&roots).unwrap();

    assert_eq!(summary.roots_scanned, 1);
    assert_eq!(summary.total_files, 2);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
}

#[test]
fn test_missing_root_is_skipped() {
    let dir = tempdir().unwrap();
    write_with_mtime(&dir.path().join("a"), b"survivor");
    write_with_mtime(&dir.path().join("b"), b"survivor");
    let missing = dir.path().join("does-not-exist");

    let finder = DuplicateFinder::with_defaults();
    let run = finder
        .run(&[missing.clone(), dir.path().to_path_buf()], RunMode::DryRun)
        .unwrap();

    assert_eq!(run.report.duplicate_sets, 1);
    assert_eq!(run.report.roots_scanned, 1);
    assert!(run
        .report
        .skipped
        .iter()
        .any(|s| s.path == missing && s.stage == "walk"));
}

#[test]
fn test_all_roots_unscannable_is_fatal() {
    let dir = tempdir().unwrap();
    let file_root = dir.path().join("plain-file");
    fs::write(&file_root, b"not a directory").unwrap();
    let roots: Vec<PathBuf> = vec![dir.path().join("missing"), file_root];

    let finder = DuplicateFinder::with_defaults();
    match finder.find_duplicates(&roots) {
        Err(FinderError::Config(FatalConfigError::NoScannableRoots(2))) => {}
        other => panic!("Expected NoScannableRoots, got {:?}", other.map(|(s, _)| s.len())),
    }
}

#[test]
fn test_no_roots_is_fatal() {
    let finder = DuplicateFinder::with_defaults();
    match finder.find_duplicates(&[]) {
        Err(FinderError::Config(FatalConfigError::NoRoots)) => {}
        other => panic!("Expected NoRoots, got {:?}", other.map(|(s, _)| s.len())),
    }
}

#[cfg(unix)]
#[test]
fn test_apply_across_roots_on_same_device() {
    use std::os::unix::fs::MetadataExt;

    let parent = tempdir().unwrap();
    let left = parent.path().join("left");
    let right = parent.path().join("right");
    fs::create_dir(&left).unwrap();
    fs::create_dir(&right).unwrap();
    write_with_mtime(&left.join("data.bin"), &[7u8; 4096]);
    write_with_mtime(&right.join("data.bin"), &[7u8; 4096]);

    let run = DuplicateFinder::with_defaults()
        .run(&[left.clone(), right.clone()], RunMode::Apply)
        .unwrap();

    assert_eq!(run.report.applied_links, 1);
    assert_eq!(run.report.realized_savings, 4096);
    let ino = |p: PathBuf| fs::metadata(p).unwrap().ino();
    assert_eq!(ino(left.join("data.bin")), ino(right.join("data.bin")));
}
