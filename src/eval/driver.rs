//! Evaluation driver: settings, test-set iteration, scoring, and budget.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EvalConfig;
use crate::data::GroundTruth;
use crate::error::EvalError;
use crate::loader::{ModuleLoader, ScriptLoader};
use crate::settings::{Framework, Settings};

use super::budget::{Clock, SystemClock, TimeBudget};
use super::performance::{CasePerformance, performance};
use super::test_set::load_test_set;

/// Score returned whenever a case is degenerate or has non-positive accuracy.
pub const SENTINEL_SCORE: f64 = -65535.0;

/// Total kept when fewer cases were scored than the test set holds.
pub const INCOMPLETE_TOTAL: f64 = 65535.0;

/// Final output of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Negated mean of MAE and RMSE; closer to zero is better.
    pub score: f64,
    #[serde(rename = "ML-framework")]
    pub framework: String,
}

impl EvaluationResult {
    pub fn sentinel(framework: Framework) -> Self {
        Self {
            score: SENTINEL_SCORE,
            framework: framework.to_string(),
        }
    }
}

/// Why a case ended the run with the sentinel score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// MAE or RMSE carried the reserved invalid marker.
    DegenerateMetric,
    /// The accuracy ratio was zero or negative.
    NonPositiveAccuracy,
}

/// The case that triggered the sentinel score.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFailure {
    pub case: usize,
    pub reason: FailureReason,
    pub performance: CasePerformance,
}

/// A successfully scored test case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub case: usize,
    pub input_file: String,
    pub output_file: String,
    pub performance: CasePerformance,
    /// Forecast and scoring time (seconds).
    pub elapsed_secs: f64,
}

/// Mean MAE and RMSE over all cases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub mae: f64,
    pub rmse: f64,
}

impl Averages {
    /// `(mae + rmse) / 2`.
    pub fn total(&self) -> f64 {
        (self.mae + self.rmse) / 2.0
    }
}

/// Running per-case MAE and RMSE values.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    maes: Vec<f64>,
    rmses: Vec<f64>,
}

impl ScoreAccumulator {
    pub fn push(&mut self, mae: f64, rmse: f64) {
        self.maes.push(mae);
        self.rmses.push(rmse);
    }

    pub fn len(&self) -> usize {
        self.maes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maes.is_empty()
    }

    /// Means over all cases, or `None` unless exactly `total_cases` (> 0)
    /// values were accumulated.
    pub fn finish(&self, total_cases: usize) -> Option<Averages> {
        if self.is_empty() || self.len() != total_cases {
            return None;
        }
        let n = self.len() as f64;
        Some(Averages {
            mae: self.maes.iter().sum::<f64>() / n,
            rmse: self.rmses.iter().sum::<f64>() / n,
        })
    }
}

/// Everything an evaluation run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: EvaluationResult,
    pub framework: Framework,
    /// Scored cases, in file-sorted order.
    pub cases: Vec<CaseRecord>,
    /// Set when a case forced the sentinel score.
    pub failure: Option<CaseFailure>,
    /// Set when every case was scored.
    pub averages: Option<Averages>,
}

/// Runs a submission against the test set.
///
/// Generic over the module loader and clock so tests can drive it with
/// in-process fakes.
pub struct Evaluator<L, C = SystemClock> {
    config: EvalConfig,
    loader: L,
    clock: C,
}

impl Evaluator<ScriptLoader> {
    /// Evaluator launching entry points as subprocesses.
    pub fn from_config(config: EvalConfig) -> Self {
        let loader = ScriptLoader::from_config(&config.loader);
        Self::new(config, loader)
    }
}

impl<L: ModuleLoader> Evaluator<L> {
    pub fn new(config: EvalConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            clock: SystemClock::default(),
        }
    }
}

impl<L: ModuleLoader, C: Clock> Evaluator<L, C> {
    /// Replaces the time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Evaluator<L, C2> {
        Evaluator {
            config: self.config,
            loader: self.loader,
            clock,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    fn since(&self, start: Duration) -> Duration {
        self.clock.now().saturating_sub(start)
    }

    /// Evaluates an unpacked submission directory.
    ///
    /// Cases run strictly in file-sorted order. The first degenerate or
    /// non-positive-accuracy case stops the run with the sentinel score;
    /// later cases are never forecast.
    ///
    /// # Errors
    ///
    /// Loader, settings, forecast, test data, and timeout failures are fatal
    /// and returned as `EvalError`.
    pub fn evaluate(&self, submission_dir: &Path) -> Result<Evaluation, EvalError> {
        let eval_start = self.clock.now();
        let mut checkpoint = eval_start;
        let mut budget = TimeBudget::from_config(&self.config.budget);

        let prep_path = submission_dir.join(&self.config.loader.prep_script);
        if !prep_path.exists() {
            return Err(EvalError::MissingPrepScript(prep_path));
        }
        let mut prep_module = self.loader.load(&prep_path)?;
        let env = prep_module.prep_env()?;
        let settings = Settings::assemble(env, submission_dir, &self.config)?;
        let framework = settings.framework;
        info!(
            %framework,
            pred_file = %settings.pred_file.display(),
            "experimental settings prepared"
        );

        let (test_x_files, test_y_files) = load_test_set(&settings)?;
        if test_x_files.len() != test_y_files.len() {
            return Err(EvalError::TestSetMismatch {
                inputs: test_x_files.len(),
                outputs: test_y_files.len(),
            });
        }
        let total_cases = test_x_files.len();
        log_timing(settings.is_debug, "test set loaded", self.since(eval_start));

        let mut forecast_module = self.loader.load(&settings.pred_file)?;
        let forecast_start = self.clock.now();

        let mut case_settings = settings.clone();
        let mut scores = ScoreAccumulator::default();
        let mut cases = Vec::with_capacity(total_cases);

        for (i, (x_file, y_file)) in test_x_files.iter().zip(&test_y_files).enumerate() {
            let case_start = self.clock.now();
            case_settings.path_to_test_x = settings.path_to_test_x.join(x_file);
            let prediction = forecast_module.forecast(&case_settings)?;
            log_timing(
                settings.is_debug,
                &format!("prediction {i}"),
                self.since(case_start),
            );

            case_settings.path_to_test_y = settings.path_to_test_y.join(y_file);
            let truth = GroundTruth::load(
                &case_settings.path_to_test_y,
                settings.start_col,
                settings.output_len,
                settings.out_var,
            )?;
            let perf = performance(&case_settings, &prediction, &truth);

            let rejection = if perf.is_degenerate() {
                Some(FailureReason::DegenerateMetric)
            } else if perf.accuracy <= 0.0 {
                Some(FailureReason::NonPositiveAccuracy)
            } else {
                None
            };
            if let Some(reason) = rejection {
                warn!(
                    case = i,
                    mae = perf.mae,
                    rmse = perf.rmse,
                    accuracy = perf.accuracy,
                    ?reason,
                    "prediction rejected, evaluation stopped"
                );
                return Ok(Evaluation {
                    result: EvaluationResult::sentinel(framework),
                    framework,
                    cases,
                    failure: Some(CaseFailure {
                        case: i,
                        reason,
                        performance: perf,
                    }),
                    averages: None,
                });
            }

            info!(
                case = i,
                rmse = perf.rmse,
                mae = perf.mae,
                score = perf.score(),
                accuracy_pct = format_args!("{:.4}", perf.accuracy * 100.0),
                "prediction scored"
            );
            scores.push(perf.mae, perf.rmse);
            cases.push(CaseRecord {
                case: i,
                input_file: x_file.clone(),
                output_file: y_file.clone(),
                performance: perf,
                elapsed_secs: self.since(case_start).as_secs_f64(),
            });

            let cases_left = total_cases - (i + 1);
            budget.charge(self.since(checkpoint), i, cases_left)?;
            checkpoint = self.clock.now();
        }

        let averages = scores.finish(total_cases);
        let total = match averages {
            Some(avg) => {
                info!(mae = avg.mae, rmse = avg.rmse, score = avg.total(), "final score");
                avg.total()
            }
            None => {
                warn!(scored = scores.len(), total_cases, "not every case was scored");
                INCOMPLETE_TOTAL
            }
        };
        log_timing(settings.is_debug, "all predictions", self.since(forecast_start));
        log_timing(settings.is_debug, "evaluation", self.since(eval_start));

        Ok(Evaluation {
            result: EvaluationResult {
                score: -total,
                framework: framework.to_string(),
            },
            framework,
            cases,
            failure: None,
            averages,
        })
    }
}

fn log_timing(is_debug: bool, stage: &str, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    if is_debug {
        info!(stage, secs, "elapsed time");
    } else {
        debug!(stage, secs, "elapsed time");
    }
}
