//! Progress reporting using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait so library
//! callers can plug in their own sink. [`Progress`] is the terminal
//! implementation used by the binary: a spinner while walking, then a bar
//! each for hashing and linking.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Pipeline phases that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Directory traversal (total unknown)
    Walking,
    /// Content fingerprinting
    Hashing,
    /// Replacing redundant files with links
    Linking,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Hashing => "hashing",
            Self::Linking => "linking",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Walking => 0,
            Self::Hashing => 1,
            Self::Linking => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress updates from the pipeline.
///
/// Callbacks may be invoked from the thread that drains the hashing pool,
/// so implementations must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// A phase started with `total` items (0 when unknown).
    fn on_phase_start(&self, phase: Phase, total: usize);

    /// `current` items (1-based) of the active phase are done; `path` is
    /// the latest one.
    fn on_progress(&self, current: usize, path: &str);

    /// An item of `bytes` bytes finished.
    fn on_item_completed(&self, _bytes: u64) {}

    fn on_phase_end(&self, phase: Phase);

    /// Replace the status message of the active bar.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress reporter.
pub struct Progress {
    multi: MultiProgress,
    bars: Mutex<[Option<ProgressBar>; 3]>,
    quiet: bool,
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Create a reporter. A quiet reporter draws nothing.
    ///
    /// ```
    /// use linkdupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new([None, None, None]),
            quiet,
        }
    }

    fn style(phase: Phase) -> ProgressStyle {
        match phase {
            Phase::Walking => {
                ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            }
            Phase::Hashing => ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-"),
            Phase::Linking => ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-"),
        }
    }

    fn with_active<F: FnOnce(&ProgressBar)>(&self, f: F) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.iter().rev().flatten().next() {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            Phase::Walking => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb.set_message("Walking roots");
                pb
            }
            Phase::Hashing => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_message("Hashing");
                pb
            }
            Phase::Linking => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_message("Linking");
                pb
            }
        };
        pb.set_style(Self::style(phase));

        if let Ok(mut bars) = self.bars.lock() {
            bars[phase.index()] = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        let message = truncate_path(path, 30);
        self.with_active(|pb| {
            pb.set_position(current as u64);
            pb.set_message(message);
        });
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }
        let finished = self
            .bars
            .lock()
            .ok()
            .and_then(|mut bars| bars[phase.index()].take());
        if let Some(pb) = finished {
            pb.finish_with_message(format!("{} complete", phase));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let message = message.to_string();
        self.with_active(|pb| pb.set_message(message));
    }
}

/// Shorten a path for display, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
