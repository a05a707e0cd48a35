//! JSON output formatter for run reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-01-01T00:00:00+00:00",
//!   "exit_code": 0,
//!   "exit_code_name": "LD000",
//!   "report": {
//!     "mode": "dry_run",
//!     "duplicate_sets": 1,
//!     "files_involved": 2,
//!     "planned_links": 1,
//!     "projected_savings": 100,
//!     "sets": [
//!       {
//!         "fingerprint": "abc123...",
//!         "size": 100,
//!         "canonical": "/data/a",
//!         "members": [
//!           { "path": "/data/a", "action": "keep" },
//!           { "path": "/data/b", "action": "link" }
//!         ]
//!       }
//!     ],
//!     "skipped": [],
//!     "link_errors": []
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExitCode;
use crate::report::Report;

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// When the document was produced
    pub generated_at: DateTime<Utc>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "LD000")
    pub exit_code_name: &'static str,
    pub report: &'a Report,
}

impl<'a> JsonOutput<'a> {
    #[must_use]
    pub fn new(report: &'a Report, exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            report,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
