use thiserror::Error;

use crate::services::results_summary::round2;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum EvaluationError {
    #[error("marks_obtained cannot be negative")]
    NegativeMarks,
    #[error("marks_obtained cannot exceed total marks ({0})")]
    ExceedsTotal(i32),
    #[error("exam has no total marks")]
    NoTotal,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Score {
    pub(crate) percentage: f64,
    pub(crate) grade: &'static str,
}

/// Lower bounds of each letter grade, highest first.
const GRADE_SCALE: &[(f64, &str)] =
    &[(90.0, "O"), (80.0, "A+"), (70.0, "A"), (60.0, "B+"), (50.0, "B"), (40.0, "C")];
const FAILING_GRADE: &str = "F";

pub(crate) fn score(marks_obtained: i32, total_marks: i32) -> Result<Score, EvaluationError> {
    if total_marks <= 0 {
        return Err(EvaluationError::NoTotal);
    }
    if marks_obtained < 0 {
        return Err(EvaluationError::NegativeMarks);
    }
    if marks_obtained > total_marks {
        return Err(EvaluationError::ExceedsTotal(total_marks));
    }

    let percentage = round2(f64::from(marks_obtained) * 100.0 / f64::from(total_marks));
    Ok(Score { percentage, grade: grade_for(percentage) })
}

pub(crate) fn grade_for(percentage: f64) -> &'static str {
    GRADE_SCALE
        .iter()
        .find(|(threshold, _)| percentage >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(FAILING_GRADE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_rounded() {
        let score = score(2, 3).expect("score");
        assert_eq!(score.percentage, 66.67);
        assert_eq!(score.grade, "B+");
    }

    #[test]
    fn grade_boundaries_are_inclusive() {
        assert_eq!(grade_for(100.0), "O");
        assert_eq!(grade_for(90.0), "O");
        assert_eq!(grade_for(89.99), "A+");
        assert_eq!(grade_for(50.0), "B");
        assert_eq!(grade_for(40.0), "C");
        assert_eq!(grade_for(39.99), "F");
        assert_eq!(grade_for(0.0), "F");
    }

    #[test]
    fn marks_must_fit_the_exam_total() {
        assert_eq!(score(-1, 50), Err(EvaluationError::NegativeMarks));
        assert_eq!(score(51, 50), Err(EvaluationError::ExceedsTotal(50)));
        assert_eq!(score(0, 0), Err(EvaluationError::NoTotal));
        assert_eq!(score(50, 50).map(|s| s.percentage), Ok(100.0));
    }
}
