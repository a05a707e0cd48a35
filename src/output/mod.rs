//! Output formatters for run reports.
//!
//! Every formatter renders a [`Report`](crate::report::Report):
//! - text for people
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::DuplicateFinder;
//! use linkdupe::error::ExitCode;
//! use linkdupe::output::JsonOutput;
//! use linkdupe::report::RunMode;
//! use std::path::PathBuf;
//!
//! let run = DuplicateFinder::with_defaults()
//!     .run(&[PathBuf::from(".")], RunMode::DryRun)
//!     .unwrap();
//!
//! let output = JsonOutput::new(&run.report, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
