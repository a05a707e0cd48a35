//! Turning fingerprinted size groups into duplicate sets.
//!
//! Within a size group, files are partitioned by fingerprint. Partitions
//! with fewer than two paths are dropped. Hardlinks cannot span devices,
//! so each partition is then split by device: every device holding two or
//! more paths yields its own [`DuplicateSet`]. Paths that are alone on
//! their device join the primary set (the largest one) and are later
//! reported as cross-device. A partition with no device holding two paths
//! stays a single set.
//!
//! Each set has one canonical member, chosen by:
//!
//! 1. the largest number of set members sharing its inode
//! 2. the shortest path (byte length)
//! 3. the lexicographically smallest path
//!
//! Linking the others to the most-linked inode means the fewest paths
//! have to be replaced. Sets whose paths already share one inode are kept
//! so they show up as already linked. Sets are ordered by size (largest
//! first), fingerprint and canonical path.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use super::groups::{DuplicateSet, SizeGroup};
use crate::scanner::{FileRecord, Fingerprint, InodeTracker};

/// Statistics from the resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Fingerprinted paths considered
    pub input_files: usize,
    /// Sets produced
    pub duplicate_sets: usize,
    /// Paths in those sets (canonical included)
    pub duplicate_files: usize,
    /// Sets whose paths already share one inode
    pub already_linked_groups: usize,
}

/// Resolve fingerprinted size groups into ordered duplicate sets.
///
/// Members without a fingerprint are ignored.
#[must_use]
pub fn resolve(groups: Vec<SizeGroup>) -> (Vec<DuplicateSet>, ResolveStats) {
    let mut stats = ResolveStats::default();
    let mut sets = Vec::new();

    for group in groups {
        let mut partitions: BTreeMap<Fingerprint, Vec<FileRecord>> = BTreeMap::new();
        for file in group.files {
            if let Some(fingerprint) = file.fingerprint {
                stats.input_files += 1;
                partitions.entry(fingerprint).or_default().push(file);
            }
        }

        for (fingerprint, members) in partitions {
            if members.len() < 2 {
                continue;
            }
            for set in split_by_device(fingerprint, group.size, members) {
                if set.members().all(|m| m.shares_inode_with(&set.canonical)) {
                    log::debug!(
                        "All {} path(s) already share one inode: {}",
                        set.len(),
                        set.canonical.path.display()
                    );
                    stats.already_linked_groups += 1;
                }
                stats.duplicate_files += set.len();
                sets.push(set);
            }
        }
    }

    sets.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
            .then_with(|| a.canonical.path.cmp(&b.canonical.path))
    });
    stats.duplicate_sets = sets.len();

    log::info!(
        "Resolved {} duplicate set(s) covering {} file(s)",
        stats.duplicate_sets,
        stats.duplicate_files
    );

    (sets, stats)
}

/// Index of the canonical member of `members`.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn select_canonical(members: &[FileRecord]) -> Option<usize> {
    let tracker: InodeTracker = members.iter().filter_map(|m| m.identity).collect();
    let links = |m: &FileRecord| m.identity.map_or(1, |id| tracker.count(&id));

    members
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| canonical_order(a, b, links(a), links(b)))
        .map(|(i, _)| i)
}

fn canonical_order(a: &FileRecord, b: &FileRecord, links_a: usize, links_b: usize) -> Ordering {
    Reverse(links_a)
        .cmp(&Reverse(links_b))
        .then_with(|| a.path.as_os_str().len().cmp(&b.path.as_os_str().len()))
        .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
}

/// One set per device holding at least two members; lone members join the
/// largest of those sets.
fn split_by_device(fingerprint: Fingerprint, size: u64, members: Vec<FileRecord>) -> Vec<DuplicateSet> {
    let mut by_device: BTreeMap<Option<u64>, Vec<FileRecord>> = BTreeMap::new();
    for member in members {
        by_device.entry(member.identity.map(|id| id.dev)).or_default().push(member);
    }

    let (shared, lone): (Vec<_>, Vec<_>) = by_device.into_values().partition(|m| m.len() >= 2);
    if shared.is_empty() {
        return vec![build_set(fingerprint, size, lone.into_iter().flatten().collect())];
    }

    let mut sets: Vec<DuplicateSet> = shared
        .into_iter()
        .map(|members| build_set(fingerprint, size, members))
        .collect();

    let stragglers: Vec<FileRecord> = lone.into_iter().flatten().collect();
    if !stragglers.is_empty() {
        let primary = sets
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                b.len()
                    .cmp(&a.len())
                    .then_with(|| canonical_order(&a.canonical, &b.canonical, 0, 0))
            })
            .map_or(0, |(i, _)| i);
        let set = &mut sets[primary];
        log::debug!(
            "{} path(s) on other devices than {}",
            stragglers.len(),
            set.canonical.path.display()
        );
        set.redundant.extend(stragglers);
        set.redundant
            .sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    }

    sets
}

fn build_set(fingerprint: Fingerprint, size: u64, mut members: Vec<FileRecord>) -> DuplicateSet {
    let index = select_canonical(&members).unwrap_or(0);
    let canonical = members.swap_remove(index);
    members.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    DuplicateSet {
        fingerprint,
        size,
        canonical,
        redundant: members,
    }
}
