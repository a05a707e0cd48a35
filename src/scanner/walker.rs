//! Directory walker built on jwalk.
//!
//! # Overview
//!
//! [`Walker::resolve`] turns the user-supplied roots into a deduplicated
//! list of canonical directories, and [`Walker::walk`] yields one
//! [`FileRecord`] per regular file below them.
//!
//! - Symbolic links are never followed, neither for files nor directories.
//! - Roots that repeat, or that sit inside another root, are walked once.
//! - Children are visited in file-name order so output is deterministic.
//! - Gitignore-style patterns prune matching files and whole directories.
//! - Unreadable entries are yielded as [`AccessError`] and the walk continues.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{AccessError, FileRecord, WalkerConfig};
use crate::actions::link::is_staging_name;

/// Walks a set of resolved roots.
#[derive(Debug)]
pub struct Walker {
    roots: Vec<PathBuf>,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Walk already-resolved roots as given.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            roots,
            config,
            shutdown_flag: None,
        }
    }

    /// Canonicalize and deduplicate `roots`.
    ///
    /// Roots that cannot be resolved, or that are not directories, are
    /// returned as errors. A root equal to or nested inside another
    /// accepted root is dropped since its files are reached anyway.
    #[must_use]
    pub fn resolve(roots: &[PathBuf], config: WalkerConfig) -> (Self, Vec<AccessError>) {
        let mut errors = Vec::new();
        let mut canonical: Vec<PathBuf> = Vec::new();

        for root in roots {
            let resolved = match std::fs::canonicalize(root) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Cannot resolve root {}: {}", root.display(), e);
                    errors.push(AccessError::from_io(root, e));
                    continue;
                }
            };
            if !resolved.is_dir() {
                log::warn!("Root is not a directory: {}", root.display());
                errors.push(AccessError::NotADirectory(root.clone()));
                continue;
            }
            if canonical.contains(&resolved) {
                log::debug!("Duplicate root ignored: {}", root.display());
                continue;
            }
            canonical.push(resolved);
        }

        let accepted: Vec<PathBuf> = canonical
            .iter()
            .filter(|root| {
                let nested = canonical
                    .iter()
                    .any(|other| other != *root && root.starts_with(other));
                if nested {
                    log::debug!("Root nested in another root: {}", root.display());
                }
                !nested
            })
            .cloned()
            .collect();

        (Self::new(accepted, config), errors)
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Roots that will be walked, in order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the ignore matcher for one root from its `.gitignore` and the
    /// configured patterns.
    fn build_gitignore(&self, root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);

        let gitignore_path = root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Walk every root, yielding regular files.
    ///
    /// Errors are yielded as [`AccessError`] values rather than stopping
    /// iteration. A path reachable from more than one root is yielded once.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, AccessError>> + '_ {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        self.roots
            .iter()
            .flat_map(move |root| self.walk_root(root))
            .filter(move |result| match result {
                Ok(record) => seen.insert(record.path.clone()),
                Err(_) => true,
            })
    }

    fn walk_root<'a>(
        &'a self,
        root: &'a Path,
    ) -> impl Iterator<Item = Result<FileRecord, AccessError>> + 'a {
        log::debug!("Walking root {}", root.display());
        let gitignore = self.build_gitignore(root);
        let prune_root = root.to_path_buf();

        let walk_dir = WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                if let Some(gi) = &gitignore {
                    children.retain(|child| match child {
                        Ok(entry) => {
                            let path = entry.path();
                            let ignored =
                                is_ignored(gi, &prune_root, &path, entry.file_type().is_dir());
                            if ignored {
                                log::trace!("Ignoring: {}", path.display());
                            }
                            !ignored
                        }
                        Err(_) => true,
                    });
                }
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    if entry.depth == 0 {
                        return None;
                    }
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }
                    let path = entry.path();
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    if !file_type.is_file() {
                        log::trace!("Skipping special file: {}", path.display());
                        return None;
                    }
                    if is_staging_name(entry.file_name()) {
                        log::warn!("Skipping leftover staging link: {}", path.display());
                        return None;
                    }
                    self.process_file(path)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| root.to_path_buf(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    let error = match e.io_error().map(std::io::Error::kind) {
                        Some(std::io::ErrorKind::PermissionDenied) => {
                            AccessError::PermissionDenied(path)
                        }
                        Some(std::io::ErrorKind::NotFound) => AccessError::NotFound(path),
                        _ => AccessError::Io {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        },
                    };
                    Some(Err(error))
                }
            }
        })
    }

    fn process_file(&self, path: PathBuf) -> Option<Result<FileRecord, AccessError>> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                let error = AccessError::from_io(&path, e);
                match &error {
                    AccessError::NotFound(_) => {
                        log::debug!("File vanished during walk: {}", path.display());
                    }
                    _ => log::warn!("{}", error),
                }
                return Some(Err(error));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if !self.config.accepts_size(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                path.display()
            );
            return None;
        }

        Some(Ok(FileRecord::from_metadata(path, &metadata)))
    }
}

/// Match `path` (below `root`) against the ignore rules.
fn is_ignored(gitignore: &Gitignore, root: &Path, path: &Path, is_dir: bool) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = relative.to_string_lossy();
    let normalized = if cfg!(windows) {
        relative.replace('\\', "/")
    } else {
        relative.into_owned()
    };
    gitignore.matched(normalized, is_dir).is_ignore()
}
