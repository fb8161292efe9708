//! Human-readable evaluation summary.

use std::fmt;

use crate::eval::{Evaluation, FailureReason};

/// Summary of an evaluation, printed to stderr by the binary.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport<'a> {
    evaluation: &'a Evaluation,
}

impl<'a> EvaluationReport<'a> {
    pub fn new(evaluation: &'a Evaluation) -> Self {
        Self { evaluation }
    }
}

impl fmt::Display for EvaluationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ev = self.evaluation;
        writeln!(f, "--- Evaluation Report ---")?;
        writeln!(f, "Framework:        {}", ev.framework)?;
        writeln!(f, "Cases scored:     {}", ev.cases.len())?;
        for c in &ev.cases {
            let p = &c.performance;
            writeln!(
                f,
                "  [{:>3}] {}: MAE {:.4}, RMSE {:.4}, accuracy {:.2}%, {:.2}s",
                c.case,
                c.input_file,
                p.mae,
                p.rmse,
                p.accuracy * 100.0,
                c.elapsed_secs
            )?;
        }
        if let Some(avg) = ev.averages {
            writeln!(f, "Average MAE:      {:.4} MW", avg.mae)?;
            writeln!(f, "Average RMSE:     {:.4} MW", avg.rmse)?;
        }
        if let Some(failure) = &ev.failure {
            let reason = match failure.reason {
                FailureReason::DegenerateMetric => "invalid MAE/RMSE",
                FailureReason::NonPositiveAccuracy => "non-positive accuracy",
            };
            writeln!(
                f,
                "Stopped at case:  {} ({reason}, accuracy {:.4})",
                failure.case, failure.performance.accuracy
            )?;
        }
        write!(f, "Score:            {}", ev.result.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Averages, CaseFailure, CasePerformance, CaseRecord, EvaluationResult};
    use crate::settings::Framework;

    fn evaluation() -> Evaluation {
        Evaluation {
            result: EvaluationResult {
                score: -15.0,
                framework: "pytorch".into(),
            },
            framework: Framework::PyTorch,
            cases: Vec::new(),
            failure: None,
            averages: Some(Averages {
                mae: 10.0,
                rmse: 20.0,
            }),
        }
    }

    #[test]
    fn report_shows_averages_and_score() {
        let text = EvaluationReport::new(&evaluation()).to_string();
        assert!(text.starts_with("--- Evaluation Report ---"));
        assert!(text.contains("Framework:        pytorch"));
        assert!(text.contains("Average MAE:      10.0000 MW"));
        assert!(text.ends_with("Score:            -15"));
    }

    #[test]
    fn report_lists_each_case() {
        let mut ev = evaluation();
        ev.cases.push(CaseRecord {
            case: 0,
            input_file: "0001in.csv".into(),
            output_file: "0001out.csv".into(),
            performance: CasePerformance {
                mae: 0.1,
                rmse: 0.2,
                accuracy: 0.5,
            },
            elapsed_secs: 1.5,
        });
        let text = EvaluationReport::new(&ev).to_string();
        assert!(text.contains("  [  0] 0001in.csv: MAE 0.1000, RMSE 0.2000, accuracy 50.00%, 1.50s"));
    }

    #[test]
    fn report_names_failed_case() {
        let mut ev = evaluation();
        ev.averages = None;
        ev.result = EvaluationResult::sentinel(Framework::PyTorch);
        ev.failure = Some(CaseFailure {
            case: 2,
            reason: FailureReason::NonPositiveAccuracy,
            performance: CasePerformance {
                mae: 0.0,
                rmse: 0.0,
                accuracy: -1.0,
            },
        });
        let text = EvaluationReport::new(&ev).to_string();
        assert!(text.contains("Stopped at case:  2 (non-positive accuracy"));
        assert!(!text.contains("Average MAE"));
        assert!(text.ends_with("-65535"));
    }
}
