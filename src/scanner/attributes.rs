//! Attribute snapshots that take part in duplicate identity.
//!
//! Two files are only ever treated as duplicates when their content *and*
//! the attributes captured here are identical. The snapshot is folded into
//! the fingerprint (see [`crate::scanner::hasher`]) through
//! [`AttributeSnapshot::to_bytes`], whose layout is fixed:
//!
//! | field        | type | bytes |
//! |--------------|------|-------|
//! | size         | u64  | 8     |
//! | mode         | u32  | 4     |
//! | uid          | u32  | 4     |
//! | gid          | u32  | 4     |
//! | mtime (secs) | i64  | 8     |
//! | mtime (nsec) | u32  | 4     |
//!
//! All fields are little-endian.

use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Permission bits kept from `st_mode` (rwx for user/group/other plus
/// setuid, setgid and sticky).
pub const PERMISSION_MASK: u32 = 0o7777;

/// Metadata subset compared when deciding whether two files are duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// File size in bytes
    pub size: u64,
    /// Permission bits (`st_mode & 0o7777`)
    pub mode: u32,
    /// Owner id
    pub uid: u32,
    /// Group id
    pub gid: u32,
    /// Modification time, whole seconds relative to the Unix epoch
    pub mtime_secs: i64,
    /// Sub-second part of the modification time
    pub mtime_nanos: u32,
}

impl AttributeSnapshot {
    /// Length of the canonical serialization produced by [`Self::to_bytes`].
    pub const ENCODED_LEN: usize = 32;

    /// Capture the tracked attributes from file metadata.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            size: metadata.len(),
            mode: metadata.mode() & PERMISSION_MASK,
            uid: metadata.uid(),
            gid: metadata.gid(),
            mtime_secs: metadata.mtime(),
            mtime_nanos: metadata.mtime_nsec() as u32,
        }
    }

    /// Capture the tracked attributes from file metadata.
    ///
    /// Ownership is not exposed on this platform, so uid/gid are zero and
    /// the mode is derived from the read-only flag.
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mode = if metadata.permissions().readonly() {
            0o444
        } else {
            0o644
        };
        let (mtime_secs, mtime_nanos) = metadata
            .modified()
            .map(split_system_time)
            .unwrap_or((0, 0));

        Self {
            size: metadata.len(),
            mode,
            uid: 0,
            gid: 0,
            mtime_secs,
            mtime_nanos,
        }
    }

    /// Canonical little-endian serialization used as fingerprint input.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..8].copy_from_slice(&self.size.to_le_bytes());
        out[8..12].copy_from_slice(&self.mode.to_le_bytes());
        out[12..16].copy_from_slice(&self.uid.to_le_bytes());
        out[16..20].copy_from_slice(&self.gid.to_le_bytes());
        out[20..28].copy_from_slice(&self.mtime_secs.to_le_bytes());
        out[28..32].copy_from_slice(&self.mtime_nanos.to_le_bytes());
        out
    }

    /// Modification time as a [`SystemTime`].
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        let nanos = Duration::from_nanos(u64::from(self.mtime_nanos));
        if self.mtime_secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.mtime_secs as u64) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(self.mtime_secs.unsigned_abs()) + nanos
        }
    }
}

/// Split a timestamp into (seconds, nanoseconds) with non-negative nanos.
#[cfg_attr(unix, allow(dead_code))]
fn split_system_time(time: SystemTime) -> (i64, u32) {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            if d.subsec_nanos() == 0 {
                (-(d.as_secs() as i64), 0)
            } else {
                (-(d.as_secs() as i64) - 1, 1_000_000_000 - d.subsec_nanos())
            }
        }
    }
}
