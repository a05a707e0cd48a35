//! Size grouping and duplicate sets.
//!
//! # Overview
//!
//! Size grouping is the first pass over the walk results. Files with
//! different sizes can never be duplicates, so only sizes shared by at
//! least two paths are kept for hashing. Groups holding paths from more
//! than one device stay together here; device boundaries are handled when
//! links are planned.
//!
//! # Example
//!
//! ```
//! use linkdupe::scanner::{AttributeSnapshot, FileRecord};
//! use linkdupe::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let attrs = |size| AttributeSnapshot { size, mode: 0o644, uid: 0, gid: 0, mtime_secs: 0, mtime_nanos: 0 };
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/a.txt"), attrs(100)),
//!     FileRecord::new(PathBuf::from("/b.txt"), attrs(100)),
//!     FileRecord::new(PathBuf::from("/c.txt"), attrs(200)),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::scanner::{FileRecord, Fingerprint};

/// Files that share one exact size.
#[derive(Debug, Clone)]
pub struct SizeGroup {
    /// File size in bytes (shared by all files in this group)
    pub size: u64,
    /// Files with this exact size
    pub files: Vec<FileRecord>,
}

impl SizeGroup {
    #[must_use]
    pub fn with_files(size: u64, files: Vec<FileRecord>) -> Self {
        Self { size, files }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Files with identical fingerprints, resolved into one canonical member
/// and the redundant members to be replaced by links to it.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Shared size in bytes
    pub size: u64,
    /// The member every other path will be linked to
    pub canonical: FileRecord,
    /// All other members, ordered by path
    pub redundant: Vec<FileRecord>,
}

impl DuplicateSet {
    /// Total number of paths in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.redundant.len() + 1
    }

    /// Always false; a set holds at least its canonical member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate canonical first, then the redundant members.
    pub fn members(&self) -> impl Iterator<Item = &FileRecord> {
        std::iter::once(&self.canonical).chain(self.redundant.iter())
    }

    /// Paths of all members, canonical first.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members().map(|f| f.path.clone()).collect()
    }

    /// Fingerprint as hexadecimal string.
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint.to_hex()
    }
}

/// Statistics from the size grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in groups of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton groups)
    pub eliminated_unique: usize,
    /// Number of size groups with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by exact size, dropping sizes seen only once.
///
/// Groups are returned largest size first. No file I/O is performed.
#[must_use]
pub fn group_by_size(files: impl IntoIterator<Item = FileRecord>) -> (Vec<SizeGroup>, GroupingStats) {
    let mut all_groups: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;
        all_groups.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_groups.len();

    let mut groups = Vec::new();
    for (size, files) in all_groups.into_iter().rev() {
        if files.len() == 1 {
            stats.eliminated_unique += 1;
            log::trace!("Eliminated unique size {}: {}", size, files[0].path.display());
            continue;
        }
        stats.potential_duplicates += files.len();
        stats.duplicate_groups += 1;
        log::debug!("Size group {} bytes: {} candidates", size, files.len());
        groups.push(SizeGroup::with_files(size, files));
    }

    log::info!(
        "Size grouping complete: {} files → {} candidates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (groups, stats)
}
