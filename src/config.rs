//! TOML-based evaluation configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Top-level evaluation configuration parsed from TOML.
///
/// All fields default to the competition constants, so an empty file (or
/// [`EvalConfig::default`]) reproduces the official evaluation. Load from
/// TOML with [`EvalConfig::from_toml_file`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Locations of the held-out test data.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Window lengths and farm constants used by scoring.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Wall-clock budget for the whole evaluation.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// How contestant entry points are located and launched.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Locations of the held-out test data.
///
/// These are never taken from the submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory of forecast input files, one per test case.
    pub test_x_dir: PathBuf,
    /// Directory of ground-truth files, one per test case.
    pub test_y_dir: PathBuf,
    /// Directory holding the reference training data.
    pub data_dir: PathBuf,
    /// File name of the reference training data inside `data_dir`.
    pub data_filename: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            test_x_dir: PathBuf::from("test_x"),
            test_y_dir: PathBuf::from("test_y"),
            data_dir: PathBuf::from("data"),
            data_filename: "wtbdata_245days.csv".to_string(),
        }
    }
}

/// Window lengths and farm constants used by scoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Timesteps per day (10-minute resolution).
    pub day_len: usize,
    /// Timesteps each forecast must cover.
    pub output_len: usize,
    /// Farm capacity; also the number of turbines scored.
    pub capacity: usize,
    /// Number of output variables per timestep.
    pub out_var: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            day_len: 144,
            output_len: 288,
            capacity: 134,
            out_var: 1,
        }
    }
}

/// Wall-clock budget for the whole evaluation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    /// Total time allowed across all test cases (seconds).
    pub max_timeout_secs: f64,
    /// Minimum time reserved per remaining test case (seconds).
    pub min_case_secs: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_timeout_secs: 3600.0 * 10.0,
            min_case_secs: 3.0,
        }
    }
}

/// How contestant entry points are located and launched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// File name of the preparation script inside the submission.
    pub prep_script: String,
    /// Interpreter per file extension; other files are executed directly.
    pub interpreters: BTreeMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            prep_script: "prepare.py".to_string(),
            interpreters: BTreeMap::from([
                ("py".to_string(), "python3".to_string()),
                ("sh".to_string(), "sh".to_string()),
            ]),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"scoring.day_len"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl EvalConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.scoring;

        for (field, value) in [
            ("scoring.day_len", s.day_len),
            ("scoring.output_len", s.output_len),
            ("scoring.capacity", s.capacity),
            ("scoring.out_var", s.out_var),
        ] {
            if value == 0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }
        if s.day_len > s.output_len {
            errors.push(ConfigError::new(
                "scoring.day_len",
                "must be <= scoring.output_len",
            ));
        }

        let b = &self.budget;
        if !(b.max_timeout_secs.is_finite() && b.max_timeout_secs > 0.0) {
            errors.push(ConfigError::new("budget.max_timeout_secs", "must be > 0"));
        }
        if !(b.min_case_secs.is_finite() && b.min_case_secs >= 0.0) {
            errors.push(ConfigError::new("budget.min_case_secs", "must be >= 0"));
        }

        let l = &self.loader;
        if l.prep_script.trim().is_empty() {
            errors.push(ConfigError::new("loader.prep_script", "must not be empty"));
        }
        if let Some(ext) = l.interpreters.iter().find(|(_, prog)| prog.trim().is_empty()) {
            errors.push(ConfigError::new(
                "loader.interpreters",
                format!("interpreter for \"{}\" must not be empty", ext.0),
            ));
        }

        errors
    }
}
