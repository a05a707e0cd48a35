//! CSV output formatter for run reports.
//!
//! One row is generated for each path of each duplicate set, canonical
//! member first.
//!
//! # Columns
//!
//! - `set_id`: 1-based index of the duplicate set
//! - `fingerprint`: BLAKE3 fingerprint (hexadecimal)
//! - `size`: File size in bytes
//! - `path`: Path of the member
//! - `action`: `keep`, `link`, `already_linked` or `cross_device`
//! - `canonical`: Path the member is (or would be) linked to
//! - `error`: Why the action did not happen, empty otherwise

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::report::Report;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    set_id: usize,
    fingerprint: &'a str,
    size: u64,
    path: String,
    action: &'static str,
    canonical: String,
    error: &'a str,
}

/// CSV output formatter.
#[derive(Debug)]
pub struct CsvOutput<'a> {
    report: &'a Report,
}

impl<'a> CsvOutput<'a> {
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, set) in self.report.sets.iter().enumerate() {
            let canonical = set.canonical.to_string_lossy().into_owned();
            for member in &set.members {
                csv_writer.serialize(CsvRow {
                    set_id: idx + 1,
                    fingerprint: &set.fingerprint,
                    size: set.size,
                    path: member.path.to_string_lossy().into_owned(),
                    action: member.action.as_str(),
                    canonical: canonical.clone(),
                    error: member.error.as_deref().unwrap_or(""),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
