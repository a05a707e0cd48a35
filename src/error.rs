//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for linkdupe.
///
/// - 0: Success (run completed, with or without duplicates or per-file errors)
/// - 1: General error (unexpected failure)
/// - 2: No scannable input (no root could be walked)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No scannable input: every root was missing, unreadable or not a directory.
    NoScannableInput = 2,
    /// Interrupted: the run was stopped by Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::NoScannableInput => "LD002",
            Self::Interrupted => "LD130",
        }
    }

    /// Exit code for an error that escaped [`run_app`](crate::run_app).
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        use crate::duplicates::FinderError;

        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            Some(FinderError::Config(_)) => Self::NoScannableInput,
            _ => match err.downcast_ref::<FatalConfigError>() {
                Some(_) => Self::NoScannableInput,
                None => Self::GeneralError,
            },
        }
    }
}

/// Problems with the invocation itself that stop the run before any hashing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalConfigError {
    /// No root was given.
    #[error("No root directories given")]
    NoRoots,

    /// Every root was rejected.
    #[error("None of the {0} root(s) could be scanned")]
    NoScannableRoots(usize),

    /// A worker count of zero.
    #[error("Worker count must be at least 1")]
    InvalidWorkers,

    /// A read chunk size of zero.
    #[error("Chunk size must be at least 1 byte")]
    InvalidChunkSize,
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
