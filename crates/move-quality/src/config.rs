//! Analysis run configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quality::Thresholds;

/// Errors in the run configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// The player name matched no White or Black header.
    #[error("Player not found in any game: {0}")]
    PlayerNotFound(String),
    /// Thresholds must satisfy `lost > undecided`.
    #[error("Lost threshold ({lost}) must be greater than undecided threshold ({undecided})")]
    InvalidThresholds { undecided: u32, lost: u32 },
    /// A numeric setting is out of range.
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// What to do when a single game fails to analyse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failing game.
    #[default]
    Abort,
    /// Log the failing game and continue without it.
    Skip,
}

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Path to the analyser executable.
    #[serde(default = "default_analyser_path")]
    pub analyser_path: PathBuf,
    /// Path to the UCI engine the analyser drives.
    #[serde(default = "default_engine_path")]
    pub engine_path: PathBuf,
    /// Engine search depth per position.
    #[serde(default = "default_search_depth")]
    pub search_depth: u32,
    /// Opening plies excluded from analysis.
    #[serde(default = "default_book_depth")]
    pub book_depth: u32,
    /// Centipawn bound of "undecided" positions.
    #[serde(default = "default_undecided_threshold")]
    pub undecided_threshold: u32,
    /// Centipawn bound beyond which a position counts as won or lost.
    #[serde(default = "default_lost_threshold")]
    pub lost_threshold: u32,
    /// Number of engine variations per position.
    #[serde(default = "default_variations")]
    pub variations: u32,
    /// Maximum number of analyser processes running at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Per-game analyser timeout in seconds.
    #[serde(default)]
    pub invocation_timeout_secs: Option<u64>,
    /// Whole-run timeout in seconds.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
    /// Keep per-game input and result files instead of deleting them.
    #[serde(default)]
    pub keep_artifacts: bool,
}

fn default_analyser_path() -> PathBuf {
    PathBuf::from("uci-analyser")
}

fn default_engine_path() -> PathBuf {
    PathBuf::from("stockfish")
}

fn default_search_depth() -> u32 {
    15
}

fn default_book_depth() -> u32 {
    20
}

fn default_undecided_threshold() -> u32 {
    200
}

fn default_lost_threshold() -> u32 {
    500
}

fn default_variations() -> u32 {
    3
}

fn default_jobs() -> usize {
    1
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analyser_path: default_analyser_path(),
            engine_path: default_engine_path(),
            search_depth: default_search_depth(),
            book_depth: default_book_depth(),
            undecided_threshold: default_undecided_threshold(),
            lost_threshold: default_lost_threshold(),
            variations: default_variations(),
            jobs: default_jobs(),
            failure_policy: FailurePolicy::default(),
            invocation_timeout_secs: None,
            run_timeout_secs: None,
            keep_artifacts: false,
        }
    }
}

impl AnalysisConfig {
    /// Check ranges and threshold ordering.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_depth < 1 {
            return Err(ConfigError::InvalidValue {
                name: "search_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.variations < 1 {
            return Err(ConfigError::InvalidValue {
                name: "variations",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.jobs < 1 {
            return Err(ConfigError::InvalidValue {
                name: "jobs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.invocation_timeout_secs == Some(0) || self.run_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "timeout",
                reason: "must be positive when set".to_string(),
            });
        }
        if self.lost_threshold <= self.undecided_threshold {
            return Err(ConfigError::InvalidThresholds {
                undecided: self.undecided_threshold,
                lost: self.lost_threshold,
            });
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            undecided: f64::from(self.undecided_threshold),
            lost: f64::from(self.lost_threshold),
        }
    }

    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.invocation_timeout_secs.map(Duration::from_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}
