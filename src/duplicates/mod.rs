//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping ([`groups`])
//! - Parallel fingerprinting of size-group members ([`scheduler`])
//! - Partitioning by fingerprint and canonical selection ([`resolver`])
//! - The end-to-end pipeline ([`finder`])

pub mod finder;
pub mod groups;
pub mod resolver;
pub mod scheduler;

pub use finder::{DedupeRun, DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{group_by_size, DuplicateSet, GroupingStats, SizeGroup};
pub use resolver::{resolve, select_canonical, ResolveStats};
pub use scheduler::{HashOutcome, HashPool, HashStats};
