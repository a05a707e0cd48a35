//! Parallel fingerprinting of size-group candidates.
//!
//! # Overview
//!
//! [`HashPool`] owns a dedicated rayon pool sized by the configured worker
//! count. Candidate paths are collapsed into one job per physical file, so
//! paths that already share an inode are read once and never by two
//! workers at the same time. Workers send their results over a channel and
//! the calling thread collects them, reporting progress as they arrive.
//!
//! The pool belongs to one invocation; it is dropped once all results are
//! in and no state is shared between runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use super::groups::SizeGroup;
use crate::progress::{Phase, ProgressCallback};
use crate::scanner::{AttributeSnapshot, FileIdentity, FileRecord, Fingerprint, Fingerprinter, ReadError};

/// Statistics from the hashing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStats {
    /// Paths that entered hashing
    pub input_files: usize,
    /// Distinct physical files read
    pub unique_inodes: usize,
    /// Paths whose fingerprint is known
    pub hashed_files: usize,
    /// Paths dropped because their file could not be fingerprinted
    pub failed_files: usize,
    /// Content bytes read
    pub bytes_hashed: u64,
    /// Whether shutdown cut the pass short
    pub interrupted: bool,
}

/// Result of [`HashPool::hash_groups`].
#[derive(Debug, Default)]
pub struct HashOutcome {
    /// Size groups with every surviving member fingerprinted
    pub groups: Vec<SizeGroup>,
    /// One error per path that could not be fingerprinted
    pub errors: Vec<ReadError>,
    pub stats: HashStats,
}

/// One read of one physical file.
struct Job {
    path: PathBuf,
    attributes: AttributeSnapshot,
}

/// Fixed-size pool of fingerprinting workers.
pub struct HashPool {
    pool: rayon::ThreadPool,
    workers: usize,
    fingerprinter: Arc<Fingerprinter>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashPool")
            .field("workers", &self.workers)
            .field("fingerprinter", &self.fingerprinter)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl HashPool {
    /// Build a pool with `workers` threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the worker threads.
    pub fn new(
        workers: usize,
        fingerprinter: Arc<Fingerprinter>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("linkdupe-hash-{i}"))
            .build()?;
        log::debug!("Hashing pool started with {} worker(s)", workers);
        Ok(Self {
            pool,
            workers,
            fingerprinter,
            progress_callback: None,
        })
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fingerprint every member of `groups`.
    ///
    /// Members that fail are removed from their group and reported in
    /// [`HashOutcome::errors`]; the remaining members carry their
    /// fingerprint. Groups keep their order.
    #[must_use]
    pub fn hash_groups(&self, groups: Vec<SizeGroup>) -> HashOutcome {
        let mut outcome = HashOutcome::default();

        let mut jobs: Vec<Job> = Vec::new();
        let mut job_of_identity: HashMap<FileIdentity, usize> = HashMap::new();
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(groups.len());

        for group in &groups {
            let mut group_jobs = Vec::with_capacity(group.files.len());
            for file in &group.files {
                outcome.stats.input_files += 1;
                let existing = file.identity.and_then(|id| job_of_identity.get(&id).copied());
                let index = existing.unwrap_or_else(|| {
                    jobs.push(Job {
                        path: file.path.clone(),
                        attributes: file.attributes,
                    });
                    let index = jobs.len() - 1;
                    if let Some(id) = file.identity {
                        job_of_identity.insert(id, index);
                    }
                    index
                });
                group_jobs.push(index);
            }
            assignments.push(group_jobs);
        }

        outcome.stats.unique_inodes = jobs.len();
        if jobs.is_empty() {
            return outcome;
        }

        log::info!(
            "Hashing {} file(s) ({} distinct) with {} worker(s)",
            outcome.stats.input_files,
            jobs.len(),
            self.workers
        );
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(Phase::Hashing, jobs.len());
        }

        let results = self.run_jobs(jobs, &mut outcome.stats);

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(Phase::Hashing);
        }

        for (group, group_jobs) in groups.into_iter().zip(assignments) {
            let mut kept = Vec::with_capacity(group.files.len());
            for (file, job) in group.files.into_iter().zip(group_jobs) {
                match &results[job] {
                    Some(Ok(fingerprint)) => kept.push(file.with_fingerprint(*fingerprint)),
                    Some(Err(e)) => {
                        outcome.stats.failed_files += 1;
                        outcome.errors.push(e.for_path(&file.path));
                    }
                    None => {
                        outcome.stats.failed_files += 1;
                        outcome.errors.push(ReadError::Interrupted(file.path));
                    }
                }
            }
            outcome.stats.hashed_files += kept.len();
            outcome.groups.push(SizeGroup::with_files(group.size, kept));
        }

        log::info!(
            "Hashing complete: {} hashed, {} failed, {} read",
            outcome.stats.hashed_files,
            outcome.stats.failed_files,
            bytesize::ByteSize::b(outcome.stats.bytes_hashed)
        );

        outcome
    }

    /// Run all jobs on the pool, collecting results by job index.
    fn run_jobs(
        &self,
        jobs: Vec<Job>,
        stats: &mut HashStats,
    ) -> Vec<Option<Result<Fingerprint, ReadError>>> {
        let total = jobs.len();
        let mut results: Vec<Option<Result<Fingerprint, ReadError>>> =
            (0..total).map(|_| None).collect();

        let (tx, rx) = mpsc::channel();
        for (index, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            let fingerprinter = Arc::clone(&self.fingerprinter);
            self.pool.spawn(move || {
                let result = fingerprinter.fingerprint(&job.path, &job.attributes);
                // The receiver only goes away once every result is in.
                let _ = tx.send((index, job.path, job.attributes.size, result));
            });
        }
        drop(tx);

        for (completed, (index, path, size, result)) in rx.into_iter().enumerate() {
            match &result {
                Ok(_) => {
                    stats.bytes_hashed += size;
                    log::trace!("Hashed: {}", path.display());
                }
                Err(e) if e.is_interrupted() => stats.interrupted = true,
                Err(e) => log::warn!("{}", e),
            }
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(completed + 1, &path.to_string_lossy());
                callback.on_item_completed(size);
            }
            results[index] = Some(result);
        }

        if stats.interrupted {
            log::info!("Hashing interrupted by shutdown signal");
        }

        results
    }
}
