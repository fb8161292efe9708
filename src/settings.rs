//! Experimental settings shared between the evaluator and a submission.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::EvalConfig;

/// Keys a preparation entry point must return.
pub const REQUIRED_KEYS: [&str; 4] = ["pred_file", "checkpoints", "start_col", "framework"];

/// Keys owned by the evaluator; contestant values for them are discarded.
const FIXED_KEYS: [&str; 9] = [
    "is_debug",
    "path_to_test_x",
    "path_to_test_y",
    "data_path",
    "filename",
    "day_len",
    "capacity",
    "output_len",
    "out_var",
];

/// Settings validation failures.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error(
        "Key error: '{0}'. The variable {0} is missing in the prepared experimental settings!"
    )]
    MissingRequiredKey(String),
    #[error(
        "Unsupported machine learning framework: {0}. The supported frameworks are 'base', \
         'paddlepaddle', 'pytorch', and 'tensorflow'"
    )]
    UnsupportedFramework(String),
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Machine learning framework declared by a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Base,
    PaddlePaddle,
    PyTorch,
    TensorFlow,
}

impl Framework {
    /// Every framework a submission may declare.
    pub const SUPPORTED: [Framework; 4] = [
        Framework::Base,
        Framework::PaddlePaddle,
        Framework::PyTorch,
        Framework::TensorFlow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Base => "base",
            Framework::PaddlePaddle => "paddlepaddle",
            Framework::PyTorch => "pytorch",
            Framework::TensorFlow => "tensorflow",
        }
    }
}

impl FromStr for Framework {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SettingsError::UnsupportedFramework(s.to_string()))
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated settings passed to every forecast call.
///
/// Serializes to the flat JSON object a forecast entry point reads from
/// stdin; contestant keys the evaluator does not know are kept in `extra`
/// and passed through.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Forecast script, resolved against the submission directory.
    pub pred_file: PathBuf,
    /// Checkpoint directory, resolved against the submission directory.
    pub checkpoints: PathBuf,
    /// Index of the first data column in turbine CSV files.
    pub start_col: usize,
    pub framework: Framework,
    pub is_debug: bool,
    /// Test-input directory, or the current case's input file during a forecast.
    pub path_to_test_x: PathBuf,
    /// Ground-truth directory, or the current case's ground-truth file.
    pub path_to_test_y: PathBuf,
    pub data_path: PathBuf,
    pub filename: String,
    pub day_len: usize,
    pub capacity: usize,
    pub output_len: usize,
    pub out_var: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Validates a preparation mapping and injects the evaluation constants.
    ///
    /// # Arguments
    ///
    /// * `env` - Mapping returned by the preparation entry point
    /// * `submission_dir` - Root of the unpacked submission
    /// * `config` - Evaluation configuration providing the fixed values
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredKey` for the first absent required key,
    /// `UnsupportedFramework` for an unknown framework name, and
    /// `InvalidValue` when a value has the wrong type.
    pub fn assemble(
        mut env: Map<String, Value>,
        submission_dir: &Path,
        config: &EvalConfig,
    ) -> Result<Self, SettingsError> {
        if let Some(key) = REQUIRED_KEYS.iter().find(|k| !env.contains_key(**k)) {
            return Err(SettingsError::MissingRequiredKey(key.to_string()));
        }

        let framework: Framework = take_string(&mut env, "framework")?.parse()?;
        let is_debug = env.remove("is_debug").is_some_and(|v| is_truthy(&v));
        let pred_file = take_string(&mut env, "pred_file")?;
        let checkpoints = take_string(&mut env, "checkpoints")?;
        let start_col = match env.remove("start_col") {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| invalid("start_col", "a non-negative integer", &Value::Number(n)))?,
            Some(other) => return Err(invalid("start_col", "a non-negative integer", &other)),
            None => return Err(SettingsError::MissingRequiredKey("start_col".to_string())),
        };

        for key in FIXED_KEYS {
            env.remove(key);
        }

        let paths = &config.paths;
        let scoring = &config.scoring;
        Ok(Self {
            pred_file: submission_dir.join(pred_file),
            checkpoints: submission_dir.join(checkpoints),
            start_col,
            framework,
            is_debug,
            path_to_test_x: paths.test_x_dir.clone(),
            path_to_test_y: paths.test_y_dir.clone(),
            data_path: paths.data_dir.clone(),
            filename: paths.data_filename.clone(),
            day_len: scoring.day_len,
            capacity: scoring.capacity,
            output_len: scoring.output_len,
            out_var: scoring.out_var,
            extra: env,
        })
    }
}

fn take_string(env: &mut Map<String, Value>, key: &str) -> Result<String, SettingsError> {
    match env.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(invalid(key, "a string", &other)),
        None => Err(SettingsError::MissingRequiredKey(key.to_string())),
    }
}

/// Loose truth test: `false`, `null`, zero, and empty strings, arrays or
/// objects are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn invalid(key: &str, expected: &str, got: &Value) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        message: format!("expected {expected}, got {got}"),
    }
}
