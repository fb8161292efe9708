//! Fatal evaluation errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::TestDataError;
use crate::eval::budget::BudgetExceeded;
use crate::loader::{LoaderError, ModuleError};
use crate::settings::SettingsError;

/// Errors that terminate an evaluation run.
///
/// Degenerate or non-positive-accuracy cases are not errors: they end the
/// run with the sentinel score instead (see [`crate::eval::FailureReason`]).
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("The preparation script, i.e. '{}', does NOT exist!", .0.display())]
    MissingPrepScript(PathBuf),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("cannot list test set directory \"{}\": {source}", .path.display())]
    TestSet {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("test set has {inputs} input files but {outputs} ground-truth files")]
    TestSetMismatch { inputs: usize, outputs: usize },
    #[error(transparent)]
    TestData(#[from] TestDataError),
    #[error(transparent)]
    Timeout(#[from] BudgetExceeded),
    #[error("Submitted file \"{}\" is not a .zip, .tar.gz or .tgz archive", .0.display())]
    BadSubmissionFormat(PathBuf),
    #[error("Submitted archive is empty")]
    EmptySubmission,
    #[error("cannot extract submission \"{}\": {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
