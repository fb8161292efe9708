use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Per-turbine readings, shaped `timesteps × columns`.
pub type Readings = Vec<Vec<f64>>;

/// Errors raised while reading a turbine CSV file.
#[derive(Debug, Error)]
pub enum TestDataError {
    /// The file could not be opened.
    #[error("cannot open test data \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file is not valid turbine CSV.
    #[error("invalid test data \"{}\": {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// CSV error from an in-memory reader.
    #[error("invalid test data: {0}")]
    Csv(#[from] csv::Error),
    /// `start_col` points past the last column.
    #[error("start column {start_col} is out of range for {columns} columns")]
    StartColumnOutOfRange { start_col: usize, columns: usize },
}

/// One raw turbine row, with unparseable or empty fields kept as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "TurbID", deserialize_with = "csv::invalid_option")]
    pub turb_id: Option<u32>,
    #[serde(rename = "Day", deserialize_with = "csv::invalid_option")]
    pub day: Option<u32>,
    #[serde(rename = "Tmstamp", deserialize_with = "csv::invalid_option")]
    pub tmstamp: Option<String>,
    /// Wind speed (m/s).
    #[serde(rename = "Wspd", deserialize_with = "csv::invalid_option")]
    pub wspd: Option<f64>,
    /// Wind direction relative to the nacelle (degrees).
    #[serde(rename = "Wdir", deserialize_with = "csv::invalid_option")]
    pub wdir: Option<f64>,
    #[serde(rename = "Etmp", deserialize_with = "csv::invalid_option")]
    pub etmp: Option<f64>,
    #[serde(rename = "Itmp", deserialize_with = "csv::invalid_option")]
    pub itmp: Option<f64>,
    /// Nacelle direction (degrees).
    #[serde(rename = "Ndir", deserialize_with = "csv::invalid_option")]
    pub ndir: Option<f64>,
    /// Blade pitch angles (degrees).
    #[serde(rename = "Pab1", deserialize_with = "csv::invalid_option")]
    pub pab1: Option<f64>,
    #[serde(rename = "Pab2", deserialize_with = "csv::invalid_option")]
    pub pab2: Option<f64>,
    #[serde(rename = "Pab3", deserialize_with = "csv::invalid_option")]
    pub pab3: Option<f64>,
    #[serde(rename = "Prtv", deserialize_with = "csv::invalid_option")]
    pub prtv: Option<f64>,
    /// Active power (kW).
    #[serde(rename = "Patv", deserialize_with = "csv::invalid_option")]
    pub patv: Option<f64>,
}

impl RawRecord {
    /// Whether any field is missing or NaN.
    pub fn has_missing(&self) -> bool {
        let numeric = [
            self.wspd, self.wdir, self.etmp, self.itmp, self.ndir, self.pab1, self.pab2,
            self.pab3, self.prtv, self.patv,
        ];
        self.turb_id.is_none()
            || self.day.is_none()
            || self.tmstamp.is_none()
            || numeric.iter().any(|v| v.is_none_or(f64::is_nan))
    }
}

/// Raw, unfilled rows for one turbine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurbineFrame {
    pub turbine_id: Option<u32>,
    pub records: Vec<RawRecord>,
}

impl TurbineFrame {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A parsed ground-truth file: readings and raw frames per turbine.
///
/// Rows are grouped into turbines by `TurbID` value, ordered by ascending ID;
/// rows keep their file order within a turbine. Rows without a parseable
/// `TurbID` belong to no turbine and are skipped.
#[derive(Debug, Clone, Default)]
pub struct TestData {
    readings: Vec<Readings>,
    frames: Vec<TurbineFrame>,
}

impl TestData {
    /// Reads a turbine CSV file.
    ///
    /// # Arguments
    ///
    /// * `path` - CSV file with a header row
    /// * `start_col` - Index of the first column copied into the readings
    ///
    /// # Errors
    ///
    /// Returns a `TestDataError` if the file cannot be opened or parsed.
    pub fn from_path(path: &Path, start_col: usize) -> Result<Self, TestDataError> {
        let file = File::open(path).map_err(|source| TestDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, start_col).map_err(|e| match e {
            TestDataError::Csv(source) => TestDataError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Reads turbine CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns a `TestDataError` if the CSV is malformed or `start_col` is out
    /// of range.
    pub fn from_reader(reader: impl Read, start_col: usize) -> Result<Self, TestDataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        if start_col >= headers.len() {
            return Err(TestDataError::StartColumnOutOfRange {
                start_col,
                columns: headers.len(),
            });
        }

        let mut turbines: BTreeMap<u32, (Readings, Vec<RawRecord>)> = BTreeMap::new();
        for result in rdr.records() {
            let record = result?;
            let raw: RawRecord = record.deserialize(Some(&headers))?;
            let Some(turbine_id) = raw.turb_id else {
                continue;
            };
            let row: Vec<f64> = record.iter().skip(start_col).map(parse_or_zero).collect();
            let (readings, records) = turbines.entry(turbine_id).or_default();
            readings.push(row);
            records.push(raw);
        }

        let mut data = Self::default();
        for (turbine_id, (readings, records)) in turbines {
            data.readings.push(readings);
            data.frames.push(TurbineFrame {
                turbine_id: Some(turbine_id),
                records,
            });
        }
        Ok(data)
    }

    /// Number of turbines found in the file.
    pub fn turbine_count(&self) -> usize {
        self.frames.len()
    }

    /// Splits into per-turbine readings (missing values as `0.0`) and raw frames.
    pub fn get_all_turbines(self) -> (Vec<Readings>, Vec<TurbineFrame>) {
        (self.readings, self.frames)
    }
}

fn parse_or_zero(field: &str) -> f64 {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .unwrap_or(0.0)
}

/// Ground truth for one test case.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    /// Per-turbine `output_len × out_var` windows.
    pub windows: Vec<Readings>,
    /// Per-turbine raw frames used for validity masking.
    pub frames: Vec<TurbineFrame>,
}

impl GroundTruth {
    /// Slices each turbine to its first `output_len` rows and last `out_var` columns.
    pub fn from_test_data(data: TestData, output_len: usize, out_var: usize) -> Self {
        let (readings, frames) = data.get_all_turbines();
        let windows = readings
            .into_iter()
            .map(|turbine| {
                turbine
                    .into_iter()
                    .take(output_len)
                    .map(|row| row[row.len().saturating_sub(out_var)..].to_vec())
                    .collect()
            })
            .collect();
        Self { windows, frames }
    }

    /// Loads and slices the ground-truth file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `TestDataError` if the file cannot be read.
    pub fn load(
        path: &Path,
        start_col: usize,
        output_len: usize,
        out_var: usize,
    ) -> Result<Self, TestDataError> {
        let data = TestData::from_path(path, start_col)?;
        Ok(Self::from_test_data(data, output_len, out_var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
TurbID,Day,Tmstamp,Wspd,Wdir,Etmp,Itmp,Ndir,Pab1,Pab2,Pab3,Prtv,Patv
1,1,00:00,5.0,1.0,20,25,10,0,0,0,-0.3,400
1,1,00:10,6.0,2.0,20,25,10,0,0,0,-0.3,
1,1,00:20,7.0,3.0,20,25,10,0,0,0,-0.3,600
2,1,00:00,4.0,1.0,20,25,10,0,0,0,-0.3,100
2,1,00:10,abc,1.0,20,25,10,0,0,0,-0.3,200
";

    #[test]
    fn groups_rows_by_turbine() {
        let data = TestData::from_reader(CSV.as_bytes(), 3).unwrap();
        assert_eq!(data.turbine_count(), 2);
        let (readings, frames) = data.get_all_turbines();
        assert_eq!(readings[0].len(), 3);
        assert_eq!(readings[1].len(), 2);
        assert_eq!(frames[0].turbine_id, Some(1));
        assert_eq!(frames[1].turbine_id, Some(2));
    }

    #[test]
    fn interleaved_turbines_are_grouped_by_id() {
        let csv = "\
TurbID,Day,Tmstamp,Wspd,Wdir,Etmp,Itmp,Ndir,Pab1,Pab2,Pab3,Prtv,Patv
2,1,00:00,4.0,1.0,20,25,10,0,0,0,-0.3,100
1,1,00:00,5.0,1.0,20,25,10,0,0,0,-0.3,400
2,1,00:10,4.0,1.0,20,25,10,0,0,0,-0.3,200
1,1,00:10,5.0,1.0,20,25,10,0,0,0,-0.3,500
x,1,00:20,5.0,1.0,20,25,10,0,0,0,-0.3,900
";
        let data = TestData::from_reader(csv.as_bytes(), 3).unwrap();
        let truth = GroundTruth::from_test_data(data, 4, 1);
        assert_eq!(truth.frames.len(), 2);
        assert_eq!(truth.frames[0].turbine_id, Some(1));
        assert_eq!(truth.windows[0], vec![vec![400.0], vec![500.0]]);
        assert_eq!(truth.frames[1].turbine_id, Some(2));
        assert_eq!(truth.windows[1], vec![vec![100.0], vec![200.0]]);
    }

    #[test]
    fn readings_start_at_start_col_and_fill_missing_with_zero() {
        let data = TestData::from_reader(CSV.as_bytes(), 3).unwrap();
        let (readings, _) = data.get_all_turbines();
        // Wspd..Patv
        assert_eq!(readings[0][0].len(), 10);
        assert_eq!(readings[0][0][0], 5.0);
        assert_eq!(readings[0][0][9], 400.0);
        assert_eq!(readings[0][1][9], 0.0);
        assert_eq!(readings[1][1][0], 0.0);
    }

    #[test]
    fn raw_frame_keeps_missing_fields() {
        let data = TestData::from_reader(CSV.as_bytes(), 3).unwrap();
        let (_, frames) = data.get_all_turbines();
        assert!(!frames[0].records[0].has_missing());
        assert_eq!(frames[0].records[1].patv, None);
        assert!(frames[0].records[1].has_missing());
        assert_eq!(frames[1].records[1].wspd, None);
        assert_eq!(frames[0].records[2].tmstamp.as_deref(), Some("00:20"));
    }

    #[test]
    fn start_col_out_of_range_is_rejected() {
        let err = TestData::from_reader(CSV.as_bytes(), 13).unwrap_err();
        assert!(matches!(
            err,
            TestDataError::StartColumnOutOfRange { columns: 13, .. }
        ));
    }

    #[test]
    fn ground_truth_windows_are_sliced() {
        let data = TestData::from_reader(CSV.as_bytes(), 3).unwrap();
        let truth = GroundTruth::from_test_data(data, 2, 1);
        assert_eq!(truth.windows[0], vec![vec![400.0], vec![0.0]]);
        assert_eq!(truth.windows[1], vec![vec![100.0], vec![200.0]]);
        // raw frames are not sliced
        assert_eq!(truth.frames[0].len(), 3);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TestData::from_path(Path::new("/nonexistent/0001out.csv"), 3).unwrap_err();
        assert!(err.to_string().contains("0001out.csv"));
    }
}
