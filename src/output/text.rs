//! Human-readable summary of a run report.
//!
//! Dry runs describe what would happen ("Planned links", "Estimated
//! savings"); apply runs describe what did ("Applied links", "Reclaimed").
//! In verbose mode every set, every skipped file and every pair that could
//! not be linked is listed with its reason.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::report::{MemberAction, Report, RunMode};

/// Plain-text report renderer.
#[derive(Debug)]
pub struct TextOutput<'a> {
    report: &'a Report,
    verbose: bool,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self {
            report,
            verbose: false,
        }
    }

    /// List sets, skipped files and link errors.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let r = self.report;

        if self.verbose {
            self.write_sets(writer)?;
        }

        let title = match r.mode {
            RunMode::DryRun => "Dry run (nothing was changed; use --apply to link)",
            RunMode::Apply => "Apply",
        };
        writeln!(writer, "{}", title.bold())?;
        writeln!(
            writer,
            "  Scanned:          {} file(s) in {} root(s), {}",
            r.files_scanned,
            r.roots_scanned,
            ByteSize::b(r.bytes_scanned)
        )?;
        writeln!(writer, "  Duplicate sets:   {}", r.duplicate_sets.cyan())?;
        writeln!(writer, "  Files involved:   {}", r.files_involved)?;

        match r.mode {
            RunMode::DryRun => {
                writeln!(writer, "  Planned links:    {}", r.planned_links.cyan())?;
                writeln!(
                    writer,
                    "  Estimated savings: {}",
                    ByteSize::b(r.projected_savings).green().bold()
                )?;
            }
            RunMode::Apply => {
                writeln!(
                    writer,
                    "  Applied links:    {} of {}",
                    r.applied_links.cyan(),
                    r.planned_links
                )?;
                writeln!(
                    writer,
                    "  Reclaimed:        {}",
                    ByteSize::b(r.realized_savings).green().bold()
                )?;
            }
        }

        if r.already_linked > 0 {
            writeln!(writer, "  Already linked:   {}", r.already_linked)?;
        }
        if r.unlinkable > 0 {
            writeln!(writer, "  Cross-device:     {}", r.unlinkable.yellow())?;
        }
        if r.has_errors() {
            writeln!(
                writer,
                "  Problems:         {} skipped, {} not linked{}",
                r.skipped.len().yellow(),
                r.link_errors.len().yellow(),
                if self.verbose { "" } else { " (use -v for details)" }
            )?;
        }
        if r.interrupted {
            writeln!(writer, "  {}", "Interrupted before finishing".red().bold())?;
        }

        if self.verbose {
            self.write_problems(writer)?;
        }

        Ok(())
    }

    fn write_sets<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (idx, set) in self.report.sets.iter().enumerate() {
            writeln!(
                writer,
                "{} {} x {} [{}]",
                format!("Set {}:", idx + 1).bold(),
                set.members.len(),
                ByteSize::b(set.size),
                &set.fingerprint[..set.fingerprint.len().min(16)]
            )?;
            for member in &set.members {
                let marker = match member.action {
                    MemberAction::Keep => "keep".green().to_string(),
                    MemberAction::Link => "link".cyan().to_string(),
                    MemberAction::AlreadyLinked => "same".dim().to_string(),
                    MemberAction::CrossDevice => "xdev".yellow().to_string(),
                };
                writeln!(writer, "  [{}] {}", marker, member.path.display())?;
            }
        }
        if !self.report.sets.is_empty() {
            writeln!(writer)?;
        }
        Ok(())
    }

    fn write_problems<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let r = self.report;
        if !r.skipped.is_empty() {
            writeln!(writer, "{}", "Skipped files:".yellow().bold())?;
            for skipped in &r.skipped {
                writeln!(writer, "  ({}) {}", skipped.stage, skipped.reason)?;
            }
        }
        if !r.link_errors.is_empty() {
            writeln!(writer, "{}", "Not linked:".yellow().bold())?;
            for error in &r.link_errors {
                writeln!(
                    writer,
                    "  {} -> {}: {}",
                    error.redundant.display(),
                    error.canonical.display(),
                    error.reason
                )?;
            }
        }
        Ok(())
    }
}
