//! Replacing redundant duplicates with hardlinks.
//!
//! # Overview
//!
//! [`LinkPlan::for_sets`] decides, for every redundant member of every
//! duplicate set, whether it needs a link, already is one, or cannot be
//! linked because it lives on another device. [`HardlinkTransaction`] then
//! either reports that plan (dry run) or carries it out (apply).
//!
//! # Safety
//!
//! Each replacement is a two-step operation:
//!
//! 1. a new hardlink to the canonical file is created under a temporary
//!    name in the redundant file's directory
//! 2. the temporary name is renamed over the redundant path
//!
//! The rename is atomic, so the redundant path always names either the old
//! file or the canonical one. If anything fails before the rename, the
//! temporary link is removed and the original is untouched. Both files are
//! re-checked against their scan-time snapshots right before linking.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::actions::link::{HardlinkTransaction, LinkPlan};
//! # let sets: Vec<linkdupe::duplicates::DuplicateSet> = Vec::new();
//!
//! let plan = LinkPlan::for_sets(&sets);
//! println!("{} link(s) planned", plan.planned_links());
//!
//! let outcome = HardlinkTransaction::new(&sets, &plan).apply();
//! println!("{} applied, {} bytes freed", outcome.applied, outcome.realized_savings);
//! ```

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::duplicates::DuplicateSet;
use crate::progress::{Phase, ProgressCallback};
use crate::scanner::{AttributeSnapshot, FileIdentity, FileRecord};

/// Prefix of temporary link names.
const TEMP_PREFIX: &str = ".linkdupe-";
/// Suffix of temporary link names.
const TEMP_SUFFIX: &str = ".tmp";

/// Whether `name` looks like a temporary link left by an interrupted run.
pub(crate) fn is_staging_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.starts_with(TEMP_PREFIX) && n.ends_with(TEMP_SUFFIX))
}

/// Error type for link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The canonical and redundant files live on different devices.
    #[error("cannot link across devices: {redundant} -> {canonical}")]
    CrossDevice { canonical: PathBuf, redundant: PathBuf },

    /// Permission denied creating the link or replacing the file.
    #[error("permission denied linking {redundant} -> {canonical}")]
    PermissionDenied { canonical: PathBuf, redundant: PathBuf },

    /// File was modified since scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// File or its directory disappeared.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// General I/O error.
    #[error("I/O error linking {redundant} -> {canonical}: {source}")]
    Io {
        canonical: PathBuf,
        redundant: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    fn from_io(canonical: &Path, redundant: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::CrossesDevices => Self::CrossDevice {
                canonical: canonical.to_path_buf(),
                redundant: redundant.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                canonical: canonical.to_path_buf(),
                redundant: redundant.to_path_buf(),
            },
            io::ErrorKind::NotFound => Self::NotFound(redundant.to_path_buf()),
            _ => Self::Io {
                canonical: canonical.to_path_buf(),
                redundant: redundant.to_path_buf(),
                source: error,
            },
        }
    }

    #[must_use]
    pub fn is_cross_device(&self) -> bool {
        matches!(self, Self::CrossDevice { .. })
    }
}

/// What will happen to one redundant member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    /// Replace with a hardlink to the canonical file.
    Link,
    /// Already shares the canonical inode; nothing to do.
    AlreadyLinked,
    /// On another device than the canonical file; cannot be linked.
    CrossDevice,
}

/// Actions for one duplicate set, parallel to [`DuplicateSet::redundant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPlan {
    pub actions: Vec<PlannedAction>,
    /// Bytes freed if every planned link succeeds
    pub projected_savings: u64,
}

/// Actions for every duplicate set, parallel to the set list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    pub sets: Vec<SetPlan>,
}

impl LinkPlan {
    /// Plan the replacements for `sets`. Performs no I/O.
    #[must_use]
    pub fn for_sets(sets: &[DuplicateSet]) -> Self {
        let sets = sets.iter().map(plan_set).collect();
        Self { sets }
    }

    /// Number of members with the given action.
    #[must_use]
    pub fn count(&self, action: PlannedAction) -> usize {
        self.sets
            .iter()
            .flat_map(|s| s.actions.iter())
            .filter(|a| **a == action)
            .count()
    }

    #[must_use]
    pub fn planned_links(&self) -> usize {
        self.count(PlannedAction::Link)
    }

    /// Bytes freed if every planned link succeeds.
    #[must_use]
    pub fn projected_savings(&self) -> u64 {
        self.sets.iter().map(|s| s.projected_savings).sum()
    }
}

fn plan_set(set: &DuplicateSet) -> SetPlan {
    let actions: Vec<PlannedAction> = set
        .redundant
        .iter()
        .map(|member| plan_member(&set.canonical, member))
        .collect();

    let mut freed: Vec<FileIdentity> = Vec::new();
    let mut unknown = 0u64;
    for (member, action) in set.redundant.iter().zip(&actions) {
        if *action != PlannedAction::Link {
            continue;
        }
        match member.identity {
            Some(id) if !freed.contains(&id) => freed.push(id),
            Some(_) => {}
            None => unknown += 1,
        }
    }

    SetPlan {
        actions,
        projected_savings: set.size * (freed.len() as u64 + unknown),
    }
}

fn plan_member(canonical: &FileRecord, member: &FileRecord) -> PlannedAction {
    if member.shares_inode_with(canonical) {
        PlannedAction::AlreadyLinked
    } else if member.on_different_device(canonical) {
        PlannedAction::CrossDevice
    } else {
        PlannedAction::Link
    }
}

/// A hardlink to the canonical file under a temporary name, waiting to be
/// renamed over its target.
///
/// Dropping an uncommitted `StagedLink` removes the temporary link.
#[derive(Debug)]
pub struct StagedLink {
    temp: NamedTempFile<()>,
    canonical: PathBuf,
    target: PathBuf,
}

impl StagedLink {
    /// Create the temporary link next to `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] when the link cannot be created.
    pub fn create(canonical: &Path, target: &Path) -> Result<Self, LinkError> {
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .make_in(dir, |temp_path| fs::hard_link(canonical, temp_path))
            .map_err(|e| LinkError::from_io(canonical, target, e))?;
        log::trace!(
            "Staged link {} -> {}",
            temp.path().display(),
            canonical.display()
        );
        Ok(Self {
            temp,
            canonical: canonical.to_path_buf(),
            target: target.to_path_buf(),
        })
    }

    /// Temporary path of the staged link.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically rename the staged link over the target.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] when the rename fails; the temporary link is
    /// removed and the target is left as it was.
    pub fn commit(self) -> Result<(), LinkError> {
        let Self {
            temp,
            canonical,
            target,
        } = self;
        temp.persist(&target)
            .map_err(|e| LinkError::from_io(&canonical, &target, e.error))
    }
}

/// A redundant member that could not be replaced.
#[derive(Debug)]
pub struct LinkFailure {
    pub canonical: PathBuf,
    pub redundant: PathBuf,
    pub error: LinkError,
}

/// Result of running a [`HardlinkTransaction`].
#[derive(Debug, Default)]
pub struct LinkOutcome {
    /// Replacements that completed
    pub applied: usize,
    /// Bytes freed by completed replacements
    pub realized_savings: u64,
    /// Members that were not replaced, including cross-device members
    pub failures: Vec<LinkFailure>,
    /// Whether shutdown stopped the run before every link was attempted
    pub interrupted: bool,
}

/// Carries out a [`LinkPlan`].
pub struct HardlinkTransaction<'a> {
    sets: &'a [DuplicateSet],
    plan: &'a LinkPlan,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HardlinkTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardlinkTransaction")
            .field("sets", &self.sets.len())
            .field("plan", &self.plan)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl<'a> HardlinkTransaction<'a> {
    /// `plan` must have been built from `sets`.
    #[must_use]
    pub fn new(sets: &'a [DuplicateSet], plan: &'a LinkPlan) -> Self {
        debug_assert_eq!(sets.len(), plan.sets.len());
        Self {
            sets,
            plan,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Stop between replacements once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Report the plan without touching the filesystem.
    ///
    /// Cross-device members are reported as failures, exactly as in
    /// [`apply`](Self::apply).
    #[must_use]
    pub fn dry_run(&self) -> LinkOutcome {
        LinkOutcome {
            failures: self.cross_device_failures(),
            ..LinkOutcome::default()
        }
    }

    /// Replace every planned member with a link to its canonical file.
    ///
    /// Failures are recorded and the run continues with the next member.
    #[must_use]
    pub fn apply(&self) -> LinkOutcome {
        let mut outcome = LinkOutcome {
            failures: self.cross_device_failures(),
            ..LinkOutcome::default()
        };
        let total = self.plan.planned_links();
        if total == 0 {
            return outcome;
        }

        log::info!("Linking {} file(s)", total);
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(Phase::Linking, total);
        }

        let mut attempted = 0usize;
        'sets: for (set, set_plan) in self.sets.iter().zip(&self.plan.sets) {
            let mut pending: HashMap<FileIdentity, usize> = HashMap::new();
            for (member, action) in set.redundant.iter().zip(&set_plan.actions) {
                if let (PlannedAction::Link, Some(id)) = (action, member.identity) {
                    *pending.entry(id).or_insert(0) += 1;
                }
            }

            for (member, action) in set.redundant.iter().zip(&set_plan.actions) {
                if *action != PlannedAction::Link {
                    continue;
                }
                if self.is_shutdown_requested() {
                    log::info!("Linking interrupted by shutdown signal");
                    outcome.interrupted = true;
                    break 'sets;
                }

                attempted += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(attempted, &member.path.to_string_lossy());
                }

                match replace_with_link(&set.canonical, member) {
                    Ok(()) => {
                        log::debug!(
                            "Linked {} -> {}",
                            member.path.display(),
                            set.canonical.path.display()
                        );
                        outcome.applied += 1;
                        let freed = match member.identity {
                            Some(id) => pending.get_mut(&id).is_some_and(|left| {
                                *left -= 1;
                                *left == 0
                            }),
                            None => true,
                        };
                        if freed {
                            outcome.realized_savings += set.size;
                            if let Some(ref callback) = self.progress_callback {
                                callback.on_item_completed(set.size);
                            }
                        }
                    }
                    Err(error) => {
                        log::warn!("{}", error);
                        outcome.failures.push(LinkFailure {
                            canonical: set.canonical.path.clone(),
                            redundant: member.path.clone(),
                            error,
                        });
                    }
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(Phase::Linking);
        }
        log::info!(
            "Linking complete: {} applied, {} failed, {} freed",
            outcome.applied,
            outcome.failures.len(),
            bytesize::ByteSize::b(outcome.realized_savings)
        );

        outcome
    }

    fn cross_device_failures(&self) -> Vec<LinkFailure> {
        let mut failures = Vec::new();
        for (set, set_plan) in self.sets.iter().zip(&self.plan.sets) {
            for (member, action) in set.redundant.iter().zip(&set_plan.actions) {
                if *action == PlannedAction::CrossDevice {
                    failures.push(LinkFailure {
                        canonical: set.canonical.path.clone(),
                        redundant: member.path.clone(),
                        error: LinkError::CrossDevice {
                            canonical: set.canonical.path.clone(),
                            redundant: member.path.clone(),
                        },
                    });
                }
            }
        }
        failures
    }
}

/// Check `record` still matches what was seen during the scan.
fn verify_unchanged(record: &FileRecord) -> Result<(), LinkError> {
    let metadata = fs::symlink_metadata(&record.path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LinkError::NotFound(record.path.clone()),
        _ => LinkError::from_io(&record.path, &record.path, e),
    })?;

    let unchanged = metadata.is_file()
        && AttributeSnapshot::from_metadata(&metadata) == record.attributes
        && (record.identity.is_none() || FileIdentity::from_metadata(&metadata) == record.identity);
    if unchanged {
        Ok(())
    } else {
        Err(LinkError::Modified(record.path.clone()))
    }
}

/// Replace `redundant` with a hardlink to `canonical`.
fn replace_with_link(canonical: &FileRecord, redundant: &FileRecord) -> Result<(), LinkError> {
    verify_unchanged(canonical)?;
    verify_unchanged(redundant)?;
    StagedLink::create(&canonical.path, &redundant.path)?.commit()
}
