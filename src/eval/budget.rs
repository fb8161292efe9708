//! Wall-clock budget for an evaluation run.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::BudgetConfig;

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real time, measured from when the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the
/// evaluator and advance another from inside a fake forecast.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wpf_eval::eval::budget::{Clock, ManualClock};
///
/// let clock = ManualClock::default();
/// let handle = clock.clone();
/// handle.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// The remaining budget cannot cover the remaining cases.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "TIMEOUT! Based on current running time analysis, it's not gonna happen that your model \
     can run {cases_left} predictions in {remaining_secs:.2} secs!"
)]
pub struct BudgetExceeded {
    pub cases_left: usize,
    pub remaining_secs: f64,
}

/// Remaining wall-clock budget with a linear admission check.
///
/// After each case the elapsed time is charged against the budget. From the
/// third case on, the run is stopped when the remaining budget is below
/// `min_case_secs × (cases_left + 1)`. This is an extrapolation, not a
/// deadline: a slow case is only noticed after it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBudget {
    remaining_secs: f64,
    min_case_secs: f64,
}

impl TimeBudget {
    pub fn new(max_timeout_secs: f64, min_case_secs: f64) -> Self {
        Self {
            remaining_secs: max_timeout_secs,
            min_case_secs,
        }
    }

    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(config.max_timeout_secs, config.min_case_secs)
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_secs
    }

    /// Charges the time spent on case `case_index` against the budget.
    ///
    /// # Arguments
    ///
    /// * `elapsed` - Time since the previous checkpoint
    /// * `case_index` - Zero-based index of the case just completed
    /// * `cases_left` - Cases still to run after this one
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` when `case_index > 1` and the remaining
    /// budget cannot cover `cases_left + 1` minimum-length cases.
    pub fn charge(
        &mut self,
        elapsed: Duration,
        case_index: usize,
        cases_left: usize,
    ) -> Result<(), BudgetExceeded> {
        self.remaining_secs -= elapsed.as_secs_f64();
        let reserve = self.min_case_secs * (cases_left + 1) as f64;
        if case_index > 1 && self.remaining_secs < reserve {
            return Err(BudgetExceeded {
                cases_left,
                remaining_secs: self.remaining_secs,
            });
        }
        Ok(())
    }
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self::from_config(&BudgetConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_ten_hours() {
        assert_eq!(TimeBudget::default().remaining_secs(), 36_000.0);
    }

    #[test]
    fn charge_subtracts_elapsed_time() {
        let mut budget = TimeBudget::new(100.0, 3.0);
        budget.charge(Duration::from_secs(30), 0, 5).unwrap();
        budget.charge(Duration::from_millis(2500), 1, 4).unwrap();
        assert!((budget.remaining_secs() - 67.5).abs() < 1e-9);
    }

    #[test]
    fn first_two_cases_are_never_checked() {
        let mut budget = TimeBudget::new(10.0, 3.0);
        assert!(budget.charge(Duration::from_secs(9), 0, 10).is_ok());
        assert!(budget.charge(Duration::from_secs(9), 1, 9).is_ok());
        assert!(budget.remaining_secs() < 0.0);
    }

    #[test]
    fn third_case_triggers_extrapolation_check() {
        let mut budget = TimeBudget::new(10.0, 3.0);
        budget.charge(Duration::from_secs(2), 0, 3).unwrap();
        budget.charge(Duration::from_secs(2), 1, 2).unwrap();
        // 4 secs left, one case left: reserve is 3 * 2 = 6
        let err = budget.charge(Duration::from_secs(2), 2, 1).unwrap_err();
        assert_eq!(err.cases_left, 1);
        assert!((err.remaining_secs - 4.0).abs() < 1e-9);
    }

    #[test]
    fn reserve_exactly_met_passes() {
        let mut budget = TimeBudget::new(12.0, 3.0);
        budget.charge(Duration::ZERO, 0, 3).unwrap();
        budget.charge(Duration::ZERO, 1, 2).unwrap();
        // 6 secs left, reserve 3 * (1 + 1) = 6
        assert!(budget.charge(Duration::from_secs(6), 2, 1).is_ok());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        other.advance(Duration::from_secs(3));
        other.advance(Duration::from_secs(4));
        assert_eq!(clock.now(), Duration::from_secs(7));
    }
}
