//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Walking one or more roots with jwalk
//! - Capturing the attribute snapshot and physical identity of each file
//! - Fingerprinting content and attributes with BLAKE3
//!
//! # Architecture
//!
//! - [`walker`]: root resolution and directory traversal
//! - [`attributes`]: the metadata subset that takes part in duplicate identity
//! - [`identity`]: `(device, inode)` identity and per-inode path counts
//! - [`hasher`]: streaming BLAKE3 fingerprints
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let (walker, errors) = Walker::resolve(&[PathBuf::from(".")], WalkerConfig::default());
//! assert!(errors.is_empty());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod attributes;
pub mod hasher;
pub mod identity;
pub mod walker;

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

pub use attributes::AttributeSnapshot;
pub use hasher::{Fingerprint, Fingerprinter, DEFAULT_CHUNK_SIZE};
pub use identity::{FileIdentity, InodeTracker};
pub use walker::Walker;

/// A regular file discovered during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path of the directory entry
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Attributes captured when the file was discovered
    pub attributes: AttributeSnapshot,
    /// Physical identity, when the platform exposes one
    pub identity: Option<FileIdentity>,
    /// Set once the file has been hashed
    pub fingerprint: Option<Fingerprint>,
}

impl FileRecord {
    /// Create a record from an attribute snapshot.
    #[must_use]
    pub fn new(path: PathBuf, attributes: AttributeSnapshot) -> Self {
        Self {
            path,
            size: attributes.size,
            attributes,
            identity: None,
            fingerprint: None,
        }
    }

    /// Create a record from metadata obtained without following symlinks.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            identity: FileIdentity::from_metadata(metadata),
            ..Self::new(path, AttributeSnapshot::from_metadata(metadata))
        }
    }

    /// Stat `path` (without following symlinks) and build a record.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessError`] when the path cannot be stat'ed.
    pub fn from_path(path: &Path) -> Result<Self, AccessError> {
        let metadata =
            std::fs::symlink_metadata(path).map_err(|e| AccessError::from_io(path, e))?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    #[must_use]
    pub fn with_identity(mut self, identity: FileIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Whether both records name the same physical file.
    #[must_use]
    pub fn shares_inode_with(&self, other: &Self) -> bool {
        match (self.identity, other.identity) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether both records are known to live on different devices.
    ///
    /// Unknown identities are assumed to share a device; the OS reports
    /// cross-device links when they are attempted.
    #[must_use]
    pub fn on_different_device(&self, other: &Self) -> bool {
        match (self.identity, other.identity) {
            (Some(a), Some(b)) => !a.same_device(&b),
            _ => false,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    /// These are applied in addition to any `.gitignore` at a root.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    #[must_use]
    pub fn new(
        skip_hidden: bool,
        min_size: Option<u64>,
        max_size: Option<u64>,
        ignore_patterns: Vec<String>,
    ) -> Self {
        Self {
            skip_hidden,
            min_size,
            max_size,
            ignore_patterns,
        }
    }

    /// Whether a file of `size` bytes passes the size filters.
    #[must_use]
    pub fn accepts_size(&self, size: u64) -> bool {
        self.min_size.is_none_or(|min| size >= min) && self.max_size.is_none_or(|max| size <= max)
    }
}

/// Errors raised while enumerating or stat'ing entries.
///
/// These never stop a scan; the entry is skipped and the error is reported.
#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A root was given that is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl AccessError {
    pub(crate) fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors raised while fingerprinting a file.
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file disappeared before it could be read.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The file changed between discovery and the end of hashing.
    #[error("File modified during scan: {0}")]
    Modified(PathBuf),

    /// Shutdown was requested before hashing completed.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    pub(crate) fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Modified(p) | Self::Interrupted(p) => p,
            Self::Io { path, .. } => path,
        }
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Re-point the error at another path naming the same file.
    #[must_use]
    pub(crate) fn for_path(&self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            Self::NotFound(_) => Self::NotFound(path),
            Self::PermissionDenied(_) => Self::PermissionDenied(path),
            Self::Modified(_) => Self::Modified(path),
            Self::Interrupted(_) => Self::Interrupted(path),
            Self::Io { source, .. } => Self::Io {
                path,
                source: io::Error::new(source.kind(), source.to_string()),
            },
        }
    }
}
