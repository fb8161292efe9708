use serde::{Deserialize, Serialize};

/// A forecast for one test case, shaped `turbines × timesteps × variables`.
///
/// Deserialized directly from the nested JSON array a forecast entry point
/// writes to stdout.
///
/// # Examples
///
/// ```
/// use wpf_eval::data::Prediction;
///
/// let p = Prediction::new(vec![vec![vec![1.0], vec![2.0]]]);
/// assert_eq!(p.turbine_count(), 1);
/// assert!(p.shape_error(1, 2, 1).is_none());
/// assert!(p.shape_error(2, 2, 1).is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prediction(Vec<Vec<Vec<f64>>>);

impl Prediction {
    /// Wraps a nested `turbines × timesteps × variables` array.
    pub fn new(values: Vec<Vec<Vec<f64>>>) -> Self {
        Self(values)
    }

    /// Number of turbines in the forecast.
    pub fn turbine_count(&self) -> usize {
        self.0.len()
    }

    /// The `timesteps × variables` block for turbine `index`.
    pub fn turbine(&self, index: usize) -> Option<&[Vec<f64>]> {
        self.0.get(index).map(Vec::as_slice)
    }

    /// Iterates over the per-turbine `timesteps × variables` blocks.
    pub fn turbines(&self) -> impl Iterator<Item = &[Vec<f64>]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Checks the array against the expected shape and for non-finite values.
    ///
    /// Returns a description of the first problem found, or `None` when the
    /// forecast is exactly `turbines × steps × vars` and finite everywhere.
    pub fn shape_error(&self, turbines: usize, steps: usize, vars: usize) -> Option<String> {
        if self.0.is_empty() {
            return Some("prediction is empty".to_string());
        }
        if self.0.len() != turbines {
            return Some(format!(
                "expected {turbines} turbines, got {}",
                self.0.len()
            ));
        }
        for (tid, block) in self.0.iter().enumerate() {
            if block.len() != steps {
                return Some(format!(
                    "turbine {tid}: expected {steps} timesteps, got {}",
                    block.len()
                ));
            }
            for (t, row) in block.iter().enumerate() {
                if row.len() != vars {
                    return Some(format!(
                        "turbine {tid}, step {t}: expected {vars} variables, got {}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Some(format!("turbine {tid}, step {t}: non-finite value"));
                }
            }
        }
        None
    }
}
