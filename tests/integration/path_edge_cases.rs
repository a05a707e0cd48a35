use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use linkdupe::report::RunMode;
use linkdupe::scanner::WalkerConfig;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// Copies only count as duplicates when their mtimes match too.
fn write_dup(path: &Path) -> bool {
    if fs::write(path, b"content").is_err() {
        return false;
    }
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(1_700_000_000, 0)).is_ok()
}

#[test]
fn test_paths_with_quotes() {
    let dir = tempdir().unwrap();

    // Windows does not allow double quotes in filenames.
    if cfg!(not(windows)) {
        assert!(write_dup(&dir.path().join("file_with_\"quote\".txt")));
        assert!(write_dup(&dir.path().join("duplicate.txt")));

        let finder = DuplicateFinder::with_defaults();
        let (sets, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(sets.len(), 1);
        assert!(sets[0]
            .members()
            .any(|f| f.path.to_string_lossy().contains('"')));
    }
}

#[test]
fn test_paths_with_newlines() {
    let dir = tempdir().unwrap();

    // Windows does not allow newlines in filenames.
    if cfg!(not(windows)) {
        assert!(write_dup(&dir.path().join("file_with\nnewline.txt")));
        assert!(write_dup(&dir.path().join("duplicate.txt")));

        let finder = DuplicateFinder::with_defaults();
        let (sets, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(sets.len(), 1);
        assert!(sets[0]
            .members()
            .any(|f| f.path.to_string_lossy().contains('\n')));
    }
}

#[test]
fn test_extremely_long_paths() {
    let dir = tempdir().unwrap();

    let mut current_path = dir.path().to_path_buf();
    let folder_name = "a".repeat(50);
    for i in 0..6 {
        current_path = current_path.join(format!("{}_{}", i, folder_name));
        if let Err(e) = fs::create_dir(&current_path) {
            eprintln!("Skipping extremely long path test: failed to create dir: {}", e);
            return;
        }
    }

    if !write_dup(&current_path.join("file.txt")) {
        eprintln!("Skipping extremely long path test: failed to create file");
        return;
    }
    assert!(write_dup(&dir.path().join("duplicate.txt")));

    let finder = DuplicateFinder::with_defaults();
    let (sets, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(sets.len(), 1);
    assert!(sets[0].canonical.path.ends_with("duplicate.txt"));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target.txt");
    assert!(write_dup(&target));
    std::os::unix::fs::symlink(&target, dir.path().join("alias.txt")).unwrap();

    let outside = tempdir().unwrap();
    assert!(write_dup(&outside.path().join("elsewhere.txt")));
    std::os::unix::fs::symlink(outside.path(), dir.path().join("linked_dir")).unwrap();

    let finder = DuplicateFinder::with_defaults();
    let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(summary.total_files, 1);
    assert!(sets.is_empty());
}

#[cfg(unix)]
#[test]
fn test_apply_leaves_symlink_untouched() {
    let dir = tempdir().unwrap();
    assert!(write_dup(&dir.path().join("a.txt")));
    assert!(write_dup(&dir.path().join("b.txt")));
    let alias = dir.path().join("c_alias.txt");
    std::os::unix::fs::symlink(dir.path().join("b.txt"), &alias).unwrap();

    let run = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()], RunMode::Apply)
        .unwrap();

    assert_eq!(run.report.applied_links, 1);
    assert!(fs::symlink_metadata(&alias).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&alias).unwrap(), b"content");
}

#[test]
fn test_skip_hidden_entries() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("visible");
    let hidden_dir = root.join(".cache");
    fs::create_dir_all(&hidden_dir).unwrap();
    assert!(write_dup(&root.join("a.txt")));
    assert!(write_dup(&root.join(".b.txt")));
    assert!(write_dup(&hidden_dir.join("c.txt")));

    let all = DuplicateFinder::with_defaults()
        .find_duplicates(&[root.clone()])
        .unwrap();
    assert_eq!(all.1.total_files, 3);

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::new(true, None, None, Vec::new()));
    let (sets, summary) = DuplicateFinder::new(config)
        .find_duplicates(&[root])
        .unwrap();
    assert_eq!(summary.total_files, 1);
    assert!(sets.is_empty());
}

#[test]
fn test_gitignore_at_root_is_honored() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(root.join("target")).unwrap();
    fs::write(root.join(".gitignore"), "target/\n").unwrap();
    assert!(write_dup(&root.join("src.txt")));
    assert!(write_dup(&root.join("target").join("copy.txt")));

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&[root])
        .unwrap();

    assert!(sets.is_empty());
}

#[cfg(unix)]
#[test]
fn test_invalid_utf8_path() {
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let invalid_name = std::ffi::OsStr::from_bytes(&[0xff, 0xfe, 0xfd]);

    // Some filesystems reject such names.
    if write_dup(&dir.path().join(invalid_name)) {
        assert!(write_dup(&dir.path().join("plain.txt")));

        let finder = DuplicateFinder::with_defaults();
        let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(summary.total_files, 2);
        assert_eq!(sets.len(), 1);
    }
}
