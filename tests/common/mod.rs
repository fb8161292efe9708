//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use wpf_eval::config::EvalConfig;
use wpf_eval::data::Prediction;
use wpf_eval::eval::ManualClock;
use wpf_eval::loader::{LoaderError, ModuleError, ModuleLoader, SubmissionModule};
use wpf_eval::settings::Settings;

/// Ground-truth CSV header.
pub const HEADER: &str = "TurbID,Day,Tmstamp,Wspd,Wdir,Etmp,Itmp,Ndir,Pab1,Pab2,Pab3,Prtv,Patv";

/// One-turbine, four-step scoring config (`day_len` 2) rooted at `root`.
pub fn small_config(root: &Path) -> EvalConfig {
    let mut cfg = EvalConfig::default();
    cfg.paths.test_x_dir = root.join("test_x");
    cfg.paths.test_y_dir = root.join("test_y");
    cfg.paths.data_dir = root.join("data");
    cfg.scoring.capacity = 1;
    cfg.scoring.output_len = 4;
    cfg.scoring.day_len = 2;
    cfg
}

/// Valid preparation mapping for a base-framework submission.
pub fn prep_env() -> Map<String, Value> {
    json!({
        "pred_file": "predict.py",
        "checkpoints": "checkpoints",
        "start_col": 3,
        "framework": "base",
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Ground-truth rows for turbine 1 with the given `Patv` values (kW).
pub fn truth_csv(patv: &[f64]) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for (i, p) in patv.iter().enumerate() {
        csv.push_str(&format!("1,1,{:02}:{:02},6.0,0.0,20,25,0,1,1,1,0,{p}\n", i / 6, (i % 6) * 10));
    }
    csv
}

/// Writes `cases` test cases; every ground-truth file holds `Patv` 1000 kW.
pub fn write_test_set(cfg: &EvalConfig, cases: usize) {
    fs::create_dir_all(&cfg.paths.test_x_dir).unwrap();
    fs::create_dir_all(&cfg.paths.test_y_dir).unwrap();
    for i in 1..=cases {
        fs::write(
            cfg.paths.test_x_dir.join(format!("{i:04}in.csv")),
            format!("{HEADER}\n"),
        )
        .unwrap();
        fs::write(
            cfg.paths.test_y_dir.join(format!("{i:04}out.csv")),
            truth_csv(&[1000.0; 4]),
        )
        .unwrap();
    }
}

/// Creates a submission directory holding an empty preparation script.
pub fn submission_dir(root: &Path, prep_script: &str) -> PathBuf {
    let dir = root.join("submission");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(prep_script), "").unwrap();
    dir
}

/// Single-turbine prediction in kW.
pub fn prediction(steps: &[f64]) -> Prediction {
    Prediction::new(vec![steps.iter().map(|v| vec![*v]).collect()])
}

/// Prediction with errors of 0, 0, 0 and 400 kW against a 1000 kW truth.
///
/// Scores MAE 0.1, RMSE 0.2 per case and a positive accuracy.
pub fn good_prediction() -> Prediction {
    prediction(&[1000.0, 1000.0, 1000.0, 1400.0])
}

/// Everything the fake loader observed.
#[derive(Debug, Default)]
pub struct Calls {
    pub loaded: Vec<PathBuf>,
    pub prep_env: usize,
    /// `path_to_test_x` of every forecast call.
    pub forecasts: Vec<PathBuf>,
}

/// In-process loader whose modules return canned values.
#[derive(Clone)]
pub struct FakeLoader {
    env: Map<String, Value>,
    predictions: Vec<Prediction>,
    clock: ManualClock,
    forecast_time: Duration,
    calls: Rc<RefCell<Calls>>,
}

impl FakeLoader {
    pub fn new(env: Map<String, Value>, predictions: Vec<Prediction>) -> Self {
        Self {
            env,
            predictions,
            clock: ManualClock::default(),
            forecast_time: Duration::ZERO,
            calls: Rc::default(),
        }
    }

    /// Every forecast advances `clock` by `per_call`.
    pub fn with_forecast_time(mut self, clock: ManualClock, per_call: Duration) -> Self {
        self.clock = clock;
        self.forecast_time = per_call;
        self
    }

    pub fn calls(&self) -> Rc<RefCell<Calls>> {
        Rc::clone(&self.calls)
    }
}

impl ModuleLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn SubmissionModule>, LoaderError> {
        self.calls.borrow_mut().loaded.push(path.to_path_buf());
        Ok(Box::new(self.clone()))
    }
}

impl SubmissionModule for FakeLoader {
    fn prep_env(&mut self) -> Result<Map<String, Value>, ModuleError> {
        self.calls.borrow_mut().prep_env += 1;
        Ok(self.env.clone())
    }

    fn forecast(&mut self, settings: &Settings) -> Result<Prediction, ModuleError> {
        let index = {
            let mut calls = self.calls.borrow_mut();
            calls.forecasts.push(settings.path_to_test_x.clone());
            calls.forecasts.len() - 1
        };
        self.clock.advance(self.forecast_time);
        self.predictions
            .get(index)
            .or(self.predictions.last())
            .cloned()
            .ok_or(ModuleError::Failed {
                entry: "forecast",
                message: "no prediction configured".into(),
            })
    }
}
