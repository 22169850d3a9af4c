//! Configuration file loading.
//!
//! Settings come from `pgn-spy.toml` in the current directory (or the file
//! given with `--config`), then command-line flags override them.
//!
//! ```toml
//! [analysis]
//! engine_path = "/usr/local/bin/stockfish"
//! search_depth = 18
//! jobs = 4
//! failure_policy = "skip"
//! ```

use std::path::{Path, PathBuf};

use move_quality::{AnalysisConfig, FailurePolicy};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Top-level layout of `pgn-spy.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl ConfigFile {
    /// Path used when `--config` is not given.
    pub fn default_path() -> PathBuf {
        PathBuf::from("pgn-spy.toml")
    }

    /// Load `path`, or the default file when `path` is `None`.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::ReadError`] if the file cannot be read,
    /// or [`ConfigFileError::ParseError`] if it contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigFileError> {
        let default_path = Self::default_path();
        let path = match path {
            Some(path) => path,
            None if default_path.exists() => default_path.as_path(),
            None => return Ok(Self::default()),
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(file)
    }
}

/// Command-line values that replace file settings when given.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub analyser_path: Option<PathBuf>,
    pub engine_path: Option<PathBuf>,
    pub search_depth: Option<u32>,
    pub book_depth: Option<u32>,
    pub undecided_threshold: Option<u32>,
    pub lost_threshold: Option<u32>,
    pub variations: Option<u32>,
    pub jobs: Option<usize>,
    pub skip_failures: bool,
    pub invocation_timeout_secs: Option<u64>,
    pub run_timeout_secs: Option<u64>,
    pub keep_artifacts: bool,
}

impl Overrides {
    pub fn apply(self, config: &mut AnalysisConfig) {
        if let Some(path) = self.analyser_path {
            config.analyser_path = path;
        }
        if let Some(path) = self.engine_path {
            config.engine_path = path;
        }
        if let Some(depth) = self.search_depth {
            config.search_depth = depth;
        }
        if let Some(depth) = self.book_depth {
            config.book_depth = depth;
        }
        if let Some(threshold) = self.undecided_threshold {
            config.undecided_threshold = threshold;
        }
        if let Some(threshold) = self.lost_threshold {
            config.lost_threshold = threshold;
        }
        if let Some(variations) = self.variations {
            config.variations = variations;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.skip_failures {
            config.failure_policy = FailurePolicy::Skip;
        }
        if self.invocation_timeout_secs.is_some() {
            config.invocation_timeout_secs = self.invocation_timeout_secs;
        }
        if self.run_timeout_secs.is_some() {
            config.run_timeout_secs = self.run_timeout_secs;
        }
        config.keep_artifacts |= self.keep_artifacts;
    }
}
