//! Error metrics for wind power forecasts.
//!
//! Per-turbine scores only count readings that pass [`is_valid_record`];
//! power values are converted from kW to MW before scoring.

use thiserror::Error;
use tracing::warn;

use crate::data::{Prediction, RawRecord, Readings, TurbineFrame};
use crate::settings::Settings;

/// Reserved value signalling that a metric could not be computed.
pub const INVALID_METRIC: f64 = 1024.0;

/// Divisor converting kW readings to MW.
pub const KW_PER_MW: f64 = 1000.0;

/// Failures of the elementary metrics.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MetricsError {
    #[error("cannot score an empty series")]
    Empty,
    #[error("prediction has {pred} values but ground truth has {truth}")]
    LengthMismatch { pred: usize, truth: usize },
}

fn check_lengths(pred: &[f64], truth: &[f64]) -> Result<(), MetricsError> {
    if pred.len() != truth.len() {
        return Err(MetricsError::LengthMismatch {
            pred: pred.len(),
            truth: truth.len(),
        });
    }
    if pred.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(())
}

/// Root-mean-square error between two equal-length series.
///
/// # Errors
///
/// Returns `Empty` for empty input and `LengthMismatch` for unequal lengths.
///
/// # Examples
///
/// ```
/// use wpf_eval::metrics::rmse;
///
/// assert_eq!(rmse(&[1.0, 2.0], &[1.0, 2.0]), Ok(0.0));
/// assert_eq!(rmse(&[0.0, 0.0], &[3.0, 3.0]), Ok(3.0));
/// ```
pub fn rmse(pred: &[f64], truth: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(pred, truth)?;
    let sq_sum: f64 = pred
        .iter()
        .zip(truth)
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    Ok((sq_sum / pred.len() as f64).sqrt())
}

/// Mean absolute error between two equal-length series.
///
/// # Errors
///
/// Returns `Empty` for empty input and `LengthMismatch` for unequal lengths.
pub fn mae(pred: &[f64], truth: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(pred, truth)?;
    let abs_sum: f64 = pred.iter().zip(truth).map(|(p, t)| (p - t).abs()).sum();
    Ok(abs_sum / pred.len() as f64)
}

/// Whether a raw reading can be trusted for scoring.
///
/// A row is rejected if any field is missing, if active power is negative,
/// if the turbine reports zero power while wind exceeds 2.5 m/s, if any
/// blade pitch exceeds 89°, or if a direction is out of its physical range.
pub fn is_valid_record(r: &RawRecord) -> bool {
    if r.has_missing() {
        return false;
    }
    let (Some(patv), Some(wspd)) = (r.patv, r.wspd) else {
        return false;
    };
    let pitched = [r.pab1, r.pab2, r.pab3]
        .iter()
        .any(|p| p.is_some_and(|v| v > 89.0));
    let bad_wdir = r.wdir.is_some_and(|v| !(-180.0..=180.0).contains(&v));
    let bad_ndir = r.ndir.is_some_and(|v| !(-720.0..=720.0).contains(&v));

    !(patv < 0.0 || (patv == 0.0 && wspd > 2.5) || pitched || bad_wdir || bad_ndir)
}

/// Validity of the first `rows` readings of a turbine.
///
/// Rows past the end of the frame are invalid.
pub fn valid_mask(frame: &TurbineFrame, rows: usize) -> Vec<bool> {
    (0..rows)
        .map(|t| frame.records.get(t).is_some_and(is_valid_record))
        .collect()
}

/// Aggregate MAE and RMSE over all turbines, in MW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailedScores {
    pub mae: f64,
    pub rmse: f64,
}

impl DetailedScores {
    /// Both metrics set to [`INVALID_METRIC`].
    pub const INVALID: Self = Self {
        mae: INVALID_METRIC,
        rmse: INVALID_METRIC,
    };

    /// Whether either metric carries the reserved invalid marker.
    pub fn is_invalid(&self) -> bool {
        self.mae == INVALID_METRIC || self.rmse == INVALID_METRIC
    }
}

/// MAE and RMSE of one turbine over its valid readings, or `None` if no
/// reading in the window is valid.
fn turbine_scores(
    pred: &[Vec<f64>],
    truth: &[Vec<f64>],
    frame: &TurbineFrame,
    examine_len: usize,
) -> Option<(f64, f64)> {
    let valid: Vec<usize> = valid_mask(frame, examine_len)
        .into_iter()
        .enumerate()
        .filter(|&(t, ok)| ok && t < truth.len())
        .map(|(t, _)| t)
        .collect();
    let tail = &valid[valid.len().saturating_sub(examine_len)..];

    let mut p = Vec::with_capacity(tail.len());
    let mut g = Vec::with_capacity(tail.len());
    for &t in tail {
        if pred[t].len() != truth[t].len() {
            return None;
        }
        p.extend(pred[t].iter().map(|v| v / KW_PER_MW));
        g.extend(truth[t].iter().map(|v| v / KW_PER_MW));
    }

    let mae = mae(&p, &g).ok()?;
    let rmse = rmse(&p, &g).ok()?;
    Some((mae, rmse))
}

/// Sums per-turbine MAE and RMSE across the farm.
///
/// Scores turbines `0..settings.capacity` over the first `settings.output_len`
/// timesteps, skipping readings rejected by [`is_valid_record`].
///
/// # Returns
///
/// [`DetailedScores::INVALID`] if the prediction is not exactly
/// `capacity × output_len × out_var` and finite, if a turbine is missing from
/// the ground truth, or if a turbine has no valid reading in the window.
pub fn regressor_detailed_scores(
    prediction: &Prediction,
    truth: &[Readings],
    frames: &[TurbineFrame],
    settings: &Settings,
) -> DetailedScores {
    if let Some(problem) =
        prediction.shape_error(settings.capacity, settings.output_len, settings.out_var)
    {
        warn!(%problem, "prediction rejected");
        return DetailedScores::INVALID;
    }

    let mut total = DetailedScores { mae: 0.0, rmse: 0.0 };
    for tid in 0..settings.capacity {
        let (Some(pred), Some(gt), Some(frame)) =
            (prediction.turbine(tid), truth.get(tid), frames.get(tid))
        else {
            warn!(turbine = tid, "turbine missing from ground truth");
            return DetailedScores::INVALID;
        };
        let Some((t_mae, t_rmse)) = turbine_scores(pred, gt, frame, settings.output_len) else {
            warn!(turbine = tid, "no valid readings in the scoring window");
            return DetailedScores::INVALID;
        };
        total.mae += t_mae;
        total.rmse += t_rmse;
    }
    total
}
