//! CSV export for per-case evaluation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::eval::CaseRecord;

/// Column header for the per-case CSV export.
const HEADER: &str = "case,input_file,output_file,mae,rmse,score,accuracy,elapsed_secs";

/// Exports scored cases to a CSV file at the given path.
///
/// Writes a header row followed by one row per case, in evaluation order.
/// Produces deterministic output for identical inputs.
///
/// # Arguments
///
/// * `cases` - Scored cases of one evaluation
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_cases_csv(cases: &[CaseRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_cases_csv(cases, buf)
}

/// Writes scored cases as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_cases_csv(cases: &[CaseRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for c in cases {
        let perf = &c.performance;
        wtr.write_record(&[
            c.case.to_string(),
            c.input_file.clone(),
            c.output_file.clone(),
            format!("{:.6}", perf.mae),
            format!("{:.6}", perf.rmse),
            format!("{:.6}", perf.score()),
            format!("{:.6}", perf.accuracy),
            format!("{:.3}", c.elapsed_secs),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
