//! Run reports.
//!
//! [`ReportBuilder`] folds the duplicate sets, their link plan, the
//! transaction outcome and the errors collected along the way into one
//! [`Report`]. Building a report never touches the filesystem; every
//! renderer in [`crate::output`] works from a `Report` alone.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::{LinkOutcome, LinkPlan, PlannedAction};
use crate::duplicates::{DuplicateSet, ScanSummary};

/// Whether a run only reports or also links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Plan and report; change nothing on disk.
    #[default]
    DryRun,
    /// Replace redundant duplicates with hardlinks.
    Apply,
}

impl RunMode {
    #[must_use]
    pub fn from_apply(apply: bool) -> Self {
        if apply {
            Self::Apply
        } else {
            Self::DryRun
        }
    }

    #[must_use]
    pub fn is_apply(self) -> bool {
        self == Self::Apply
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of one path inside a duplicate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberAction {
    /// The retained file.
    Keep,
    Link,
    AlreadyLinked,
    CrossDevice,
}

impl MemberAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Link => "link",
            Self::AlreadyLinked => "already_linked",
            Self::CrossDevice => "cross_device",
        }
    }
}

impl From<PlannedAction> for MemberAction {
    fn from(action: PlannedAction) -> Self {
        match action {
            PlannedAction::Link => Self::Link,
            PlannedAction::AlreadyLinked => Self::AlreadyLinked,
            PlannedAction::CrossDevice => Self::CrossDevice,
        }
    }
}

impl fmt::Display for MemberAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One path of a reported set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    pub path: PathBuf,
    pub action: MemberAction,
    /// Why the planned action did not happen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One duplicate set, canonical member first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetReport {
    pub fingerprint: String,
    pub size: u64,
    pub canonical: PathBuf,
    pub members: Vec<MemberReport>,
    pub projected_savings: u64,
}

/// A path left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    /// `walk` or `hash`
    pub stage: &'static str,
    pub reason: String,
}

/// A duplicate pair that was not linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkErrorReport {
    pub canonical: PathBuf,
    pub redundant: PathBuf,
    pub cross_device: bool,
    pub reason: String,
}

/// Everything one invocation found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub mode: RunMode,
    pub roots_scanned: usize,
    pub files_scanned: usize,
    pub bytes_scanned: u64,
    pub duplicate_sets: usize,
    /// Paths in duplicate sets, canonical members included
    pub files_involved: usize,
    pub planned_links: usize,
    pub applied_links: usize,
    pub already_linked: usize,
    /// Members on another device than their canonical file
    pub unlinkable: usize,
    pub projected_savings: u64,
    pub realized_savings: u64,
    pub interrupted: bool,
    pub duration_ms: u64,
    pub sets: Vec<SetReport>,
    pub skipped: Vec<SkippedFile>,
    pub link_errors: Vec<LinkErrorReport>,
}

impl Report {
    /// Links made in apply mode, links planned in a dry run.
    #[must_use]
    pub fn links(&self) -> usize {
        match self.mode {
            RunMode::DryRun => self.planned_links,
            RunMode::Apply => self.applied_links,
        }
    }

    /// Bytes reclaimed in apply mode, bytes that would be in a dry run.
    #[must_use]
    pub fn savings(&self) -> u64 {
        match self.mode {
            RunMode::DryRun => self.projected_savings,
            RunMode::Apply => self.realized_savings,
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.skipped.is_empty() || !self.link_errors.is_empty()
    }
}

/// Builds a [`Report`] from the products of one run.
///
/// # Example
///
/// ```
/// use linkdupe::actions::{HardlinkTransaction, LinkPlan};
/// use linkdupe::report::{ReportBuilder, RunMode};
///
/// let sets = Vec::new();
/// let plan = LinkPlan::for_sets(&sets);
/// let outcome = HardlinkTransaction::new(&sets, &plan).dry_run();
///
/// let report = ReportBuilder::new(RunMode::DryRun, &sets, &plan, &outcome).build();
/// assert_eq!(report.duplicate_sets, 0);
/// ```
#[derive(Debug)]
pub struct ReportBuilder<'a> {
    mode: RunMode,
    sets: &'a [DuplicateSet],
    plan: &'a LinkPlan,
    outcome: &'a LinkOutcome,
    summary: Option<&'a ScanSummary>,
    duration: Option<Duration>,
}

impl<'a> ReportBuilder<'a> {
    /// `plan` must have been built from `sets`, and `outcome` produced by
    /// running that plan.
    #[must_use]
    pub fn new(
        mode: RunMode,
        sets: &'a [DuplicateSet],
        plan: &'a LinkPlan,
        outcome: &'a LinkOutcome,
    ) -> Self {
        Self {
            mode,
            sets,
            plan,
            outcome,
            summary: None,
            duration: None,
        }
    }

    /// Include scan totals and skipped files.
    #[must_use]
    pub fn with_summary(mut self, summary: &'a ScanSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Wall-clock time of the whole run. Defaults to the scan duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn build(&self) -> Report {
        let failures: HashMap<&Path, String> = self
            .outcome
            .failures
            .iter()
            .map(|f| (f.redundant.as_path(), f.error.to_string()))
            .collect();

        let sets: Vec<SetReport> = self
            .sets
            .iter()
            .zip(&self.plan.sets)
            .map(|(set, set_plan)| {
                let mut members = Vec::with_capacity(set.len());
                members.push(MemberReport {
                    path: set.canonical.path.clone(),
                    action: MemberAction::Keep,
                    error: None,
                });
                for (member, action) in set.redundant.iter().zip(&set_plan.actions) {
                    members.push(MemberReport {
                        path: member.path.clone(),
                        action: (*action).into(),
                        error: failures.get(member.path.as_path()).cloned(),
                    });
                }
                SetReport {
                    fingerprint: set.fingerprint_hex(),
                    size: set.size,
                    canonical: set.canonical.path.clone(),
                    members,
                    projected_savings: set_plan.projected_savings,
                }
            })
            .collect();

        let mut skipped = Vec::new();
        if let Some(summary) = self.summary {
            skipped.extend(summary.access_errors.iter().map(|e| SkippedFile {
                path: e.path().to_path_buf(),
                stage: "walk",
                reason: e.to_string(),
            }));
            skipped.extend(summary.read_errors.iter().map(|e| SkippedFile {
                path: e.path().to_path_buf(),
                stage: "hash",
                reason: e.to_string(),
            }));
        }

        let link_errors = self
            .outcome
            .failures
            .iter()
            .map(|f| LinkErrorReport {
                canonical: f.canonical.clone(),
                redundant: f.redundant.clone(),
                cross_device: f.error.is_cross_device(),
                reason: f.error.to_string(),
            })
            .collect();

        let duration = self
            .duration
            .or_else(|| self.summary.map(|s| s.scan_duration))
            .unwrap_or_default();

        Report {
            mode: self.mode,
            roots_scanned: self.summary.map_or(0, |s| s.roots_scanned),
            files_scanned: self.summary.map_or(0, |s| s.total_files),
            bytes_scanned: self.summary.map_or(0, |s| s.total_size),
            duplicate_sets: self.sets.len(),
            files_involved: self.sets.iter().map(DuplicateSet::len).sum(),
            planned_links: self.plan.planned_links(),
            applied_links: self.outcome.applied,
            already_linked: self.plan.count(PlannedAction::AlreadyLinked),
            unlinkable: self.plan.count(PlannedAction::CrossDevice),
            projected_savings: self.plan.projected_savings(),
            realized_savings: self.outcome.realized_savings,
            interrupted: self.outcome.interrupted || self.summary.is_some_and(|s| s.interrupted),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            sets,
            skipped,
            link_errors,
        }
    }
}
