//! linkdupe - in-place duplicate file deduplication via hardlinks.
//!
//! Files are duplicates when their content and their size, permission
//! bits, owner, group and modification time all match. Every redundant
//! copy can be replaced by a hardlink to one canonical file, which frees
//! its space while every path keeps working.
//!
//! The pipeline is: walk ([`scanner`]) → group by size → fingerprint in
//! parallel → resolve sets ([`duplicates`]) → plan and link ([`actions`])
//! → report ([`report`], [`output`]).

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::report::{Report, RunMode};

/// Run one invocation and write its report to stdout.
///
/// Per-file problems never fail the run; they are part of the report.
///
/// # Errors
///
/// Returns an error when the configuration is invalid, no root can be
/// scanned, the run is interrupted before linking starts, or the report
/// cannot be written. [`ExitCode::for_error`] maps these to exit codes.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref());
    config.merge_cli(&cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    if cli.save_config {
        let path = cli
            .config
            .clone()
            .or_else(Config::config_path)
            .context("No configuration directory available")?;
        config.save_to(&path)?;
        log::info!("Saved configuration to {}", path.display());
        if cli.roots.is_empty() {
            return Ok(ExitCode::Success);
        }
    }

    let handler = signal::install_handler()?;
    let show_progress = !cli.quiet && config.output == OutputFormat::Text;
    let finder_config = config
        .to_finder_config()
        .with_shutdown_flag(handler.flag())
        .with_progress_callback(Arc::new(Progress::new(!show_progress)));

    let mode = RunMode::from_apply(cli.apply);
    let run = DuplicateFinder::new(finder_config).run(&cli.roots, mode)?;

    let exit_code = if run.report.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &run.report, config.output, &cli, exit_code)?;
    out.flush().context("Failed to flush report")?;

    Ok(exit_code)
}

fn write_report<W: Write>(
    out: &mut W,
    report: &Report,
    format: OutputFormat,
    cli: &Cli,
    exit_code: ExitCode,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if !cli.quiet {
                TextOutput::new(report)
                    .with_verbose(cli.verbose > 0)
                    .write_to(out)
                    .context("Failed to write report")?;
            }
        }
        OutputFormat::Json => JsonOutput::new(report, exit_code).write_to(out, true)?,
        OutputFormat::Csv => CsvOutput::new(report).write_to(out)?,
    }
    Ok(())
}
