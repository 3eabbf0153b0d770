use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Full pipeline configuration. Threaded explicitly into every core call;
/// there is no hidden module-level default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cleaning: CleaningConfig,
    pub sqri: SqriWeights,
    /// Number of rows kept in the peak-day ranking
    pub peak_days_top_n: usize,
}

/// Rules applied while normalizing raw export rows into refund records
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Amounts strictly above this ceiling are treated as outliers and nulled
    pub max_refund_amount: f64,
    /// Case-insensitive substring that marks a row as a refund
    pub refund_keyword: String,
    /// Refunds at or above this amount count as high-value for SQRI
    pub high_value_threshold: f64,
}

/// Weights for the Sleep Quality Risk Index composite score
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqriWeights {
    pub accommodation_share_weight: f64,
    pub accommodation_avg_weight: f64,
    pub high_value_share_weight: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleaning: CleaningConfig::default(),
            sqri: SqriWeights::default(),
            peak_days_top_n: 10,
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_refund_amount: 1000.0,
            refund_keyword: "refund".to_string(),
            high_value_threshold: 100.0,
        }
    }
}

impl Default for SqriWeights {
    fn default() -> Self {
        Self {
            accommodation_share_weight: 0.5,
            accommodation_avg_weight: 0.3,
            high_value_share_weight: 0.2,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Any section or key left out
    /// falls back to its default.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the given file, or fall back to defaults when no file is
    /// configured.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
