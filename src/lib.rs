//! Evaluator for wind power forecasting competition submissions.

/// Command-line options.
pub mod cli;
/// TOML evaluation config and validation.
pub mod config;
pub mod data;
pub mod error;
/// Evaluation driver, time budget, and per-case scoring.
pub mod eval;
pub mod io;
/// Submission entry points and how they are launched.
pub mod loader;
pub mod metrics;
pub mod reporting;
pub mod settings;
pub mod submission;

pub use error::EvalError;
