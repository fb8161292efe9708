use std::fs;
use std::io;
use std::path::Path;

use crate::error::EvalError;
use crate::settings::Settings;

/// Lists the test set as `(input_files, output_files)`.
///
/// Each directory listing is sorted by file name independently; the caller
/// pairs index `i` of both lists as one test case. Names are not checked for
/// correspondence.
///
/// # Errors
///
/// Returns `EvalError::TestSet` if either directory cannot be read.
pub fn load_test_set(settings: &Settings) -> Result<(Vec<String>, Vec<String>), EvalError> {
    let inputs = sorted_file_names(&settings.path_to_test_x)?;
    let outputs = sorted_file_names(&settings.path_to_test_y)?;
    Ok((inputs, outputs))
}

fn sorted_file_names(dir: &Path) -> Result<Vec<String>, EvalError> {
    let err = |source: io::Error| EvalError::TestSet {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(err)? {
        let entry = entry.map_err(err)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
