//! Physical file identity (device + inode).
//!
//! Several paths can name one underlying file. Those paths are never
//! duplicates of each other: they already share storage. This module
//! captures the `(device, inode)` pair that identifies the underlying
//! file and counts how many discovered paths point at each one.
//!
//! # Platform Support
//!
//! - **Unix**: `(st_dev, st_ino)` from file metadata
//! - **Other**: no identity is available; every path is treated as its own
//!   file and cross-device checks fall back to the OS link error

use std::collections::HashMap;
use std::fs::Metadata;

use serde::{Deserialize, Serialize};

/// The `(device, inode)` pair naming one physical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Device (volume) id
    pub dev: u64,
    /// Inode number on that device
    pub ino: u64,
}

impl FileIdentity {
    /// Create an identity from raw device and inode numbers.
    #[must_use]
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Read the identity from file metadata.
    ///
    /// Returns `None` on platforms without inode semantics.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Whether both identities live on the same device.
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.dev == other.dev
    }

    /// Whether identities can be read on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

/// Counts discovered paths per physical file.
#[derive(Debug, Default)]
pub struct InodeTracker {
    counts: HashMap<FileIdentity, usize>,
}

impl InodeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one path pointing at `identity`.
    ///
    /// Returns `true` the first time an identity is recorded.
    pub fn record(&mut self, identity: FileIdentity) -> bool {
        let count = self.counts.entry(identity).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Number of recorded paths pointing at `identity`.
    #[must_use]
    pub fn count(&self, identity: &FileIdentity) -> usize {
        self.counts.get(identity).copied().unwrap_or(0)
    }

    /// Number of distinct physical files recorded.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.counts.len()
    }
}

impl FromIterator<FileIdentity> for InodeTracker {
    fn from_iter<I: IntoIterator<Item = FileIdentity>>(iter: I) -> Self {
        let mut tracker = Self::new();
        for identity in iter {
            tracker.record(identity);
        }
        tracker
    }
}
