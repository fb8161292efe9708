//! Evaluation pipeline: time budget, test set, per-case scoring, and driver.

/// Wall-clock budget and clocks.
pub mod budget;
/// The evaluation driver.
pub mod driver;
/// Per-case farm scoring.
pub mod performance;
/// Test-set directory listing.
pub mod test_set;

pub use budget::{BudgetExceeded, Clock, ManualClock, SystemClock, TimeBudget};
pub use driver::{
    Averages, CaseFailure, CaseRecord, Evaluation, EvaluationResult, Evaluator, FailureReason,
    INCOMPLETE_TOTAL, SENTINEL_SCORE, ScoreAccumulator,
};
pub use performance::{CasePerformance, performance};
pub use test_set::load_test_set;
