//! Scoring engine collaborator.
//!
//! Thin wrapper around a YAML-configured weighted score: the lifecycle
//! layer delegates `/run-scores` here and returns whatever this module
//! produces. The config file (default `score_1.yaml`) lists metrics with
//! weights and fallback values:
//!
//! ```yaml
//! name: esg-baseline
//! metrics:
//!   - name: emissions
//!     weight: 0.5
//!     default: 40.0
//!   - name: governance
//!     weight: 0.5
//!     default: 60.0
//! ```

mod handler;

pub use handler::{health, run_scores};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Scoring configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreConfig {
    /// Score name reported in results.
    pub name: String,
    /// Weighted metrics.
    pub metrics: Vec<MetricSpec>,
}

/// One weighted metric.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub weight: f64,
    /// Value used when the request supplies none.
    #[serde(default)]
    pub default: f64,
}

/// Result of one score run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub name: String,
    pub score: f64,
    pub metrics: Vec<MetricScore>,
}

/// Per-metric contribution.
#[derive(Debug, Clone, Serialize)]
pub struct MetricScore {
    pub name: String,
    pub value: f64,
    pub weighted: f64,
}

/// Scoring errors, surfaced to the client as the engine's own 500 body.
#[derive(Debug)]
pub enum ScoringError {
    /// Config file could not be read.
    Io { path: PathBuf, error: std::io::Error },
    /// Config file is not valid YAML for [`ScoreConfig`].
    Parse { path: PathBuf, error: serde_yaml::Error },
    /// Request body is not valid JSON for [`ScoreRequest`].
    BadRequest(String),
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringError::Io { path, error } => {
                write!(f, "failed to read {}: {}", path.display(), error)
            }
            ScoringError::Parse { path, error } => {
                write!(f, "failed to parse {}: {}", path.display(), error)
            }
            ScoringError::BadRequest(msg) => write!(f, "bad request: {}", msg),
        }
    }
}

impl std::error::Error for ScoringError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScoringError::Io { error, .. } => Some(error),
            ScoringError::Parse { error, .. } => Some(error),
            ScoringError::BadRequest(_) => None,
        }
    }
}

/// Request body for `/run-scores` (optional; GET runs with defaults).
#[derive(Debug, Default, Deserialize)]
pub struct ScoreRequest {
    /// Metric values keyed by metric name; missing metrics use defaults.
    #[serde(default)]
    pub values: HashMap<String, f64>,
}

/// Weighted-score engine bound to a named configuration file.
pub struct ScoringEngine {
    config_path: PathBuf,
}

impl ScoringEngine {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration file. Read per run so config edits apply
    /// without a restart.
    pub fn load_config(&self) -> Result<ScoreConfig, ScoringError> {
        let raw = std::fs::read_to_string(&self.config_path).map_err(|error| ScoringError::Io {
            path: self.config_path.clone(),
            error,
        })?;
        serde_yaml::from_str(&raw).map_err(|error| ScoringError::Parse {
            path: self.config_path.clone(),
            error,
        })
    }

    /// Compute the weighted score for the supplied values.
    pub fn run(&self, request: &ScoreRequest) -> Result<ScoreResult, ScoringError> {
        let config = self.load_config()?;

        let mut metrics = Vec::with_capacity(config.metrics.len());
        let mut score = 0.0;
        for spec in &config.metrics {
            let value = request
                .values
                .get(&spec.name)
                .copied()
                .unwrap_or(spec.default);
            let weighted = value * spec.weight;
            score += weighted;
            metrics.push(MetricScore {
                name: spec.name.clone(),
                value,
                weighted,
            });
        }

        Ok(ScoreResult {
            name: config.name,
            score,
            metrics,
        })
    }
}
