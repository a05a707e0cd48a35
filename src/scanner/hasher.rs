//! BLAKE3 content fingerprinting.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a 256-bit BLAKE3 digest over a fixed stream:
//!
//! 1. the domain tag `linkdupe-fp-v1\0`
//! 2. the 32-byte [`AttributeSnapshot`] encoding
//! 3. the file content, read in chunks of [`DEFAULT_CHUNK_SIZE`] bytes
//!
//! Because the attributes are hashed ahead of the content, two files only
//! share a fingerprint when both their bytes and their tracked metadata are
//! identical. After the content is read, the metadata of the *open handle*
//! is compared to the snapshot; a mismatch means the file changed while it
//! was being hashed and the result is discarded.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{AttributeSnapshot, Fingerprinter};
//! use std::path::Path;
//!
//! let path = Path::new("some/file.bin");
//! let attributes = AttributeSnapshot::from_metadata(&std::fs::symlink_metadata(path)?);
//! let fingerprint = Fingerprinter::new().fingerprint(path, &attributes)?;
//! println!("{}", fingerprint);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{AttributeSnapshot, ReadError};

/// Default read size for content hashing (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Domain separation tag, bumped whenever the digest layout changes.
const DOMAIN_TAG: &[u8] = b"linkdupe-fp-v1\0";

/// 256-bit digest over attributes and content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal form (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }

    /// Parse a 64-character hexadecimal string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        blake3::Hash::from_hex(hex).ok().map(Self::from)
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fingerprint: {hex}")))
    }
}

/// Streaming fingerprint calculator.
///
/// Stateless apart from its configuration, so one instance can be shared by
/// every worker of a hashing pool.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    chunk_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_flag: None,
        }
    }

    /// Set the read size. Zero is raised to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Abort in-progress reads once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Fingerprint the file at `path`, which was observed with `attributes`.
    ///
    /// # Errors
    ///
    /// - [`ReadError::NotFound`] / [`ReadError::PermissionDenied`] / [`ReadError::Io`]
    ///   when the file cannot be opened or read
    /// - [`ReadError::Modified`] when the file no longer matches `attributes`
    /// - [`ReadError::Interrupted`] when shutdown was requested mid-read
    pub fn fingerprint(
        &self,
        path: &Path,
        attributes: &AttributeSnapshot,
    ) -> Result<Fingerprint, ReadError> {
        if self.is_shutdown_requested() {
            return Err(ReadError::Interrupted(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|e| ReadError::from_io(path, e))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(&attributes.to_bytes());

        let mut buffer = vec![0u8; self.chunk_size];
        let mut bytes_read = 0u64;
        loop {
            if self.is_shutdown_requested() {
                log::debug!("Hashing interrupted: {}", path.display());
                return Err(ReadError::Interrupted(path.to_path_buf()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
            bytes_read += n as u64;
        }

        let current = file
            .metadata()
            .map(|m| AttributeSnapshot::from_metadata(&m))
            .map_err(|e| ReadError::from_io(path, e))?;
        if bytes_read != attributes.size || current != *attributes {
            log::debug!(
                "File changed while hashing ({} of {} bytes read): {}",
                bytes_read,
                attributes.size,
                path.display()
            );
            return Err(ReadError::Modified(path.to_path_buf()));
        }

        Ok(hasher.finalize().into())
    }
}
