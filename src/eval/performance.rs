//! Per-case scoring on the whole wind farm.

use crate::data::{GroundTruth, Prediction};
use crate::metrics::{DetailedScores, KW_PER_MW, regressor_detailed_scores, rmse};
use crate::settings::Settings;

/// Scores of one test case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CasePerformance {
    /// Summed per-turbine MAE (MW).
    pub mae: f64,
    /// Summed per-turbine RMSE (MW).
    pub rmse: f64,
    /// `1 - farm_rmse / capacity`, or `-1` when the farm RMSE is not positive.
    pub accuracy: f64,
}

impl CasePerformance {
    /// Case score: the mean of MAE and RMSE.
    pub fn score(&self) -> f64 {
        (self.mae + self.rmse) / 2.0
    }

    /// Whether either metric carries the reserved invalid marker.
    pub fn is_degenerate(&self) -> bool {
        DetailedScores {
            mae: self.mae,
            rmse: self.rmse,
        }
        .is_invalid()
    }
}

/// Farm-level series: per-turbine last-variable values summed over the final
/// `day_len` timesteps and converted to MW.
///
/// Returns `None` when there are no turbines, a turbine has fewer than
/// `day_len` timesteps, or a timestep has no variables.
fn farm_tail<'a>(
    turbines: impl IntoIterator<Item = &'a [Vec<f64>]>,
    day_len: usize,
) -> Option<Vec<f64>> {
    let mut farm: Option<Vec<f64>> = None;
    for steps in turbines {
        let start = steps.len().checked_sub(day_len)?;
        let sums = farm.get_or_insert_with(|| vec![0.0; day_len]);
        for (sum, row) in sums.iter_mut().zip(&steps[start..]) {
            *sum += row.last()?;
        }
    }
    farm.map(|sums| sums.into_iter().map(|v| v / KW_PER_MW).collect())
}

/// Scores one prediction against its ground truth.
///
/// The accuracy ratio uses the farm-level RMSE over the last `day_len`
/// timesteps of the last output variable; a farm RMSE of zero (or one that
/// cannot be computed) yields an accuracy of `-1`. MAE and RMSE come from
/// [`regressor_detailed_scores`].
pub fn performance(
    settings: &Settings,
    prediction: &Prediction,
    truth: &GroundTruth,
) -> CasePerformance {
    let farm_pred = farm_tail(prediction.turbines(), settings.day_len);
    let farm_truth = farm_tail(truth.windows.iter().map(Vec::as_slice), settings.day_len);
    let farm_rmse = match (farm_pred, farm_truth) {
        (Some(p), Some(t)) => rmse(&p, &t).ok(),
        _ => None,
    };
    let accuracy = match farm_rmse {
        Some(r) if r > 0.0 => 1.0 - r / settings.capacity as f64,
        _ => -1.0,
    };

    let detailed =
        regressor_detailed_scores(prediction, &truth.windows, &truth.frames, settings);
    CasePerformance {
        mae: detailed.mae,
        rmse: detailed.rmse,
        accuracy,
    }
}
