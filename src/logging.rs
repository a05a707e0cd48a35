//! Logging setup.
//!
//! linkdupe logs through the `log` facade with an `env_logger` backend.
//! The level comes from, in priority order:
//!
//! 1. the `RUST_LOG` environment variable
//! 2. `--quiet` (errors only)
//! 3. `-v` (debug) or `-vv` (trace)
//! 4. info
//!
//! Skipped files and pairs that cannot be linked are logged at `warn`;
//! per-file decisions at `debug` and `trace`.
//!
//! Debug builds prefix every line with a timestamp (and the module path
//! once `-v` is given); release builds print only level and message.

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Environment variable that overrides the CLI verbosity flags.
const ENV_FILTER: &str = "RUST_LOG";

/// Install the global logger.
///
/// Calling this more than once is harmless; later calls leave the first
/// logger in place. Returns the level selected by the flags, or `None`
/// when `RUST_LOG` decides.
///
/// ```rust,no_run
/// use linkdupe::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("visible with -v");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    let mut builder = Builder::new();

    let level = if env::var_os(ENV_FILTER).is_some() {
        builder.parse_env(ENV_FILTER);
        None
    } else {
        let level = level_for(verbose, quiet);
        builder.filter_level(level);
        Some(level)
    };

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        log::trace!("Logger already installed");
    } else {
        match level {
            Some(level) => log::debug!("Logging initialized at {}", level),
            None => log::debug!("Logging initialized from {}", ENV_FILTER),
        }
    }
    level
}

/// Level selected by the CLI flags. `quiet` wins over `verbose`.
fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        let timestamp = buf.timestamp_seconds();
        if verbose > 0 {
            writeln!(
                buf,
                "{timestamp} {style}{:<5}{style:#} [{}] {}",
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{timestamp} {style}{:<5}{style:#} {}",
                record.level(),
                record.args()
            )
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
    });
}
