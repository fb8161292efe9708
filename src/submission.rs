//! Submission archives (`.zip`, `.tar.gz`): format check, extraction, and
//! evaluation.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::EvalError;
use crate::eval::{Clock, Evaluation, Evaluator};
use crate::loader::ModuleLoader;

/// Container formats accepted as submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// File name suffixes and the format each one selects.
    pub const SUFFIXES: [(&'static str, ArchiveFormat); 3] = [
        (".zip", ArchiveFormat::Zip),
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
    ];

    /// Format implied by the file name of `path`, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
            .map(|&(_, format)| format)
    }
}

/// Whether `path` names a supported submission archive.
pub fn is_supported_archive(path: &Path) -> bool {
    ArchiveFormat::from_path(path).is_some()
}

/// Extracts `archive` into `dest` and returns the submission root.
///
/// When the archive holds exactly one top-level directory, that directory is
/// the root; otherwise `dest` itself is.
///
/// # Errors
///
/// * `BadSubmissionFormat` if the file name has no supported suffix
/// * `Archive` if the file cannot be read or decompressed
/// * `EmptySubmission` if nothing was extracted
pub fn unpack(archive: &Path, dest: &Path) -> Result<PathBuf, EvalError> {
    let Some(format) = ArchiveFormat::from_path(archive) else {
        return Err(EvalError::BadSubmissionFormat(archive.to_path_buf()));
    };
    let err = |source: io::Error| EvalError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let file = BufReader::new(File::open(archive).map_err(err)?);
    match format {
        ArchiveFormat::Zip => {
            let mut zipped = ZipArchive::new(file).map_err(|e| err(io::Error::from(e)))?;
            zipped.extract(dest).map_err(|e| err(io::Error::from(e)))?;
        }
        ArchiveFormat::TarGz => {
            tar::Archive::new(GzDecoder::new(file))
                .unpack(dest)
                .map_err(err)?;
        }
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dest).map_err(err)? {
        entries.push(entry.map_err(err)?.path());
    }
    debug!(archive = %archive.display(), ?format, entries = entries.len(), "submission extracted");

    match entries.as_slice() {
        [] => Err(EvalError::EmptySubmission),
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dest.to_path_buf()),
    }
}

/// Unpacks a submission archive into a scratch directory and evaluates it.
///
/// The scratch directory is removed when this returns, whatever the outcome.
///
/// # Errors
///
/// Archive errors from [`unpack`] plus everything [`Evaluator::evaluate`]
/// returns.
pub fn run<L: ModuleLoader, C: Clock>(
    submission: &Path,
    evaluator: &Evaluator<L, C>,
) -> Result<Evaluation, EvalError> {
    if !is_supported_archive(submission) {
        return Err(EvalError::BadSubmissionFormat(submission.to_path_buf()));
    }
    let workspace = tempfile::Builder::new()
        .prefix("wpf-eval-")
        .tempdir()
        .map_err(|source| EvalError::Archive {
            path: submission.to_path_buf(),
            source,
        })?;
    let root = unpack(submission, workspace.path())?;
    info!(submission = %submission.display(), root = %root.display(), "evaluating submission");
    evaluator.evaluate(&root)
}
