//! Pipeline orchestration for one invocation.
//!
//! # Overview
//!
//! [`DuplicateFinder`] runs the whole detection pipeline:
//! 1. **Walk** - resolve the roots and collect regular files
//! 2. **Group** - group by exact size (see [`crate::duplicates::groups`])
//! 3. **Hash** - fingerprint every candidate on a per-run [`HashPool`]
//! 4. **Resolve** - split by fingerprint and pick canonical members
//!
//! [`DuplicateFinder::run`] continues with planning, the hardlink
//! transaction (dry run or apply) and the final report.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
//! use linkdupe::report::RunMode;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_workers(4));
//! let run = finder.run(&[PathBuf::from(".")], RunMode::DryRun).unwrap();
//!
//! println!("{} duplicate set(s)", run.report.duplicate_sets);
//! println!("{} bytes could be reclaimed", run.report.projected_savings);
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::groups::{group_by_size, DuplicateSet};
use super::resolver::resolve;
use super::scheduler::HashPool;
use crate::actions::{HardlinkTransaction, LinkOutcome, LinkPlan};
use crate::error::FatalConfigError;
use crate::progress::{Phase, ProgressCallback};
use crate::report::{Report, ReportBuilder, RunMode};
use crate::scanner::{
    AccessError, FileRecord, Fingerprinter, ReadError, Walker, WalkerConfig, DEFAULT_CHUNK_SIZE,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of hashing workers.
    pub workers: usize,
    /// Read size used while fingerprinting.
    pub chunk_size: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("chunk_size", &self.chunk_size)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the fingerprinting read size (at least one byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Number of CPUs, or one when that cannot be determined.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Summary statistics from the detection phases.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Roots that were walked after de-duplication
    pub roots_scanned: usize,
    /// Regular files that passed the filters
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Files ruled out because their size was unique
    pub eliminated_by_size: usize,
    /// Paths with a fingerprint
    pub hashed_files: usize,
    /// Physical files read while hashing
    pub unique_inodes: usize,
    /// Duplicate sets found
    pub duplicate_sets: usize,
    /// Duration of the detection phases
    pub scan_duration: Duration,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Paths and roots that could not be walked
    pub access_errors: Vec<AccessError>,
    /// Files that could not be fingerprinted
    pub read_errors: Vec<ReadError>,
}

/// Errors that stop a run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Run interrupted by user")]
    Interrupted,

    /// The invocation cannot be carried out.
    #[error(transparent)]
    Config(#[from] FatalConfigError),

    /// The hashing pool could not be started.
    #[error("Failed to start hashing workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything produced by [`DuplicateFinder::run`].
#[derive(Debug)]
pub struct DedupeRun {
    pub sets: Vec<DuplicateSet>,
    pub plan: LinkPlan,
    pub outcome: LinkOutcome,
    pub summary: ScanSummary,
    pub report: Report,
}

/// Runs the detection pipeline and the link transaction.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    fingerprinter: Arc<Fingerprinter>,
}

impl DuplicateFinder {
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut fingerprinter = Fingerprinter::new().with_chunk_size(config.chunk_size);
        if let Some(ref flag) = config.shutdown_flag {
            fingerprinter = fingerprinter.with_shutdown_flag(Arc::clone(flag));
        }
        Self {
            config,
            fingerprinter: Arc::new(fingerprinter),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find every duplicate set under `roots`.
    ///
    /// Roots that are missing or not directories are recorded in
    /// [`ScanSummary::access_errors`] and skipped.
    ///
    /// # Errors
    ///
    /// - [`FatalConfigError::NoRoots`] when `roots` is empty
    /// - [`FatalConfigError::NoScannableRoots`] when every root was rejected
    /// - [`FinderError::Interrupted`] when shutdown is requested
    /// - [`FinderError::Pool`] when the hashing pool cannot start
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateSet>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if roots.is_empty() {
            return Err(FatalConfigError::NoRoots.into());
        }

        let (walker, root_errors) = Walker::resolve(roots, self.config.walker_config.clone());
        for error in &root_errors {
            log::warn!("Skipping root: {}", error);
        }
        if walker.roots().is_empty() {
            return Err(FatalConfigError::NoScannableRoots(roots.len()).into());
        }
        let walker = match self.config.shutdown_flag {
            Some(ref flag) => walker.with_shutdown_flag(Arc::clone(flag)),
            None => walker,
        };

        log::info!(
            "Scanning {} root(s): {}",
            walker.roots().len(),
            walker
                .roots()
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(Phase::Walking, 0);
        }

        let mut files = Vec::new();
        let mut access_errors = root_errors;
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    access_errors.push(e);
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(Phase::Walking);
        }

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (sets, mut summary) = self.find_duplicates_from_records(files)?;
        summary.roots_scanned = walker.roots().len();
        summary.access_errors = access_errors;
        summary.scan_duration = start_time.elapsed();

        Ok((sets, summary))
    }

    /// Find duplicates among files that were already collected.
    ///
    /// # Errors
    ///
    /// [`FinderError::Interrupted`] when shutdown is requested, and
    /// [`FinderError::Pool`] when the hashing pool cannot start.
    pub fn find_duplicates_from_records(
        &self,
        files: Vec<FileRecord>,
    ) -> Result<(Vec<DuplicateSet>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        let (size_groups, size_stats) = group_by_size(files);
        summary.total_files = size_stats.total_files;
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;

        log::info!(
            "Found {} file(s) ({}), {:.1}% ruled out by size",
            summary.total_files,
            bytesize::ByteSize::b(summary.total_size),
            size_stats.elimination_rate()
        );

        if size_groups.is_empty() {
            log::info!("No files share a size, nothing to hash");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let mut pool = HashPool::new(self.config.workers, Arc::clone(&self.fingerprinter))?;
        if let Some(ref callback) = self.config.progress_callback {
            pool = pool.with_progress_callback(Arc::clone(callback));
        }
        let hashed = pool.hash_groups(size_groups);
        drop(pool);

        summary.hashed_files = hashed.stats.hashed_files;
        summary.unique_inodes = hashed.stats.unique_inodes;
        summary.read_errors = hashed
            .errors
            .into_iter()
            .filter(|e| !e.is_interrupted())
            .collect();

        if hashed.stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (sets, resolve_stats) = resolve(hashed.groups);
        summary.duplicate_sets = resolve_stats.duplicate_sets;
        summary.scan_duration = start_time.elapsed();

        Ok((sets, summary))
    }

    /// Detect duplicates under `roots`, plan their replacement and carry it
    /// out according to `mode`.
    ///
    /// Linking only starts once every file has been hashed. A shutdown
    /// request during linking does not fail the run; the report is marked
    /// interrupted instead.
    ///
    /// # Errors
    ///
    /// See [`find_duplicates`](Self::find_duplicates).
    pub fn run(&self, roots: &[PathBuf], mode: RunMode) -> Result<DedupeRun, FinderError> {
        let start_time = Instant::now();
        let (sets, summary) = self.find_duplicates(roots)?;

        let plan = LinkPlan::for_sets(&sets);
        let mut transaction = HardlinkTransaction::new(&sets, &plan);
        if let Some(ref flag) = self.config.shutdown_flag {
            transaction = transaction.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            transaction = transaction.with_progress_callback(Arc::clone(callback));
        }

        let outcome = match mode {
            RunMode::DryRun => transaction.dry_run(),
            RunMode::Apply => transaction.apply(),
        };

        let report = ReportBuilder::new(mode, &sets, &plan, &outcome)
            .with_summary(&summary)
            .with_duration(start_time.elapsed())
            .build();

        log::info!(
            "Run complete ({}): {} set(s), {} link(s), {}",
            mode,
            report.duplicate_sets,
            report.links(),
            bytesize::ByteSize::b(report.savings())
        );

        Ok(DedupeRun {
            sets,
            plan,
            outcome,
            summary,
            report,
        })
    }
}
