//! Layered application configuration.
//!
//! Settings are merged in this order, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config PATH`, or `config.toml` in the platform
//!    config directory)
//! 3. `LINKDUPE_*` environment variables (e.g. `LINKDUPE_WORKERS=8`)
//! 4. command-line flags ([`Config::merge_cli`])
//!
//! # Example file
//!
//! ```toml
//! workers = 8
//! min_size = 4096
//! skip_hidden = true
//! ignore_patterns = ["*.tmp", "node_modules/"]
//! output = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};
use crate::duplicates::finder::default_workers;
use crate::duplicates::FinderConfig;
use crate::error::FatalConfigError;
use crate::scanner::{WalkerConfig, DEFAULT_CHUNK_SIZE};

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "LINKDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hashing workers; unset means one per CPU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Read size used while fingerprinting, in bytes.
    pub chunk_size: usize,
    /// Smallest file considered. Empty files free nothing, so the default is 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    pub skip_hidden: bool,
    /// Gitignore-style patterns added to each root's `.gitignore`.
    pub ignore_patterns: Vec<String>,
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_size: Some(1),
            max_size: None,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// Never fails: a missing file means defaults plus environment, and an
    /// unreadable or invalid file is logged and ignored.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        match path.map(Path::to_path_buf).or_else(Self::config_path) {
            Some(path) => Self::load_from_path(path),
            None => Self::figment(None).extract().unwrap_or_else(|e| {
                log::warn!("Ignoring invalid environment configuration: {}", e);
                Self::default()
            }),
        }
    }

    /// Load from a specific file, falling back to defaults on error.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring configuration {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from a specific file.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns the figment error for malformed TOML, values of the wrong
    /// type or malformed environment variables.
    pub fn try_load_from_path(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        let path = path.as_ref();
        let config: Self = Self::figment(Some(path)).extract()?;
        log::debug!("Configuration loaded (file: {})", path.display());
        Ok(config)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Apply command-line flags on top of the loaded settings.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.workers = Some(workers);
        }
        if let Some(min_size) = cli.min_size {
            self.min_size = Some(min_size);
        }
        if let Some(max_size) = cli.max_size {
            self.max_size = Some(max_size);
        }
        if cli.skip_hidden {
            self.skip_hidden = true;
        }
        self.ignore_patterns.extend(cli.ignore_patterns.iter().cloned());
        if let Some(output) = cli.output {
            self.output = output;
        }
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// [`FatalConfigError::InvalidWorkers`] for zero workers and
    /// [`FatalConfigError::InvalidChunkSize`] for a zero chunk size.
    pub fn validate(&self) -> Result<(), FatalConfigError> {
        if self.workers == Some(0) {
            return Err(FatalConfigError::InvalidWorkers);
        }
        if self.chunk_size == 0 {
            return Err(FatalConfigError::InvalidChunkSize);
        }
        Ok(())
    }

    #[must_use]
    pub fn to_walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(
            self.skip_hidden,
            self.min_size,
            self.max_size,
            self.ignore_patterns.clone(),
        )
    }

    /// Finder settings without shutdown flag or progress callback.
    #[must_use]
    pub fn to_finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_workers(self.workers.unwrap_or_else(default_workers))
            .with_chunk_size(self.chunk_size)
            .with_walker_config(self.to_walker_config())
    }

    /// Write the settings as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Default platform-specific configuration file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "linkdupe", "linkdupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
