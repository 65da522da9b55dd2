use std::collections::HashSet;

use crate::db::models::ExamResult;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StudentSummary {
    pub(crate) completed_exams: usize,
    pub(crate) total_submissions: usize,
    /// `None` when no published result carries a percentage. Never defaulted to zero.
    pub(crate) average_percentage: Option<f64>,
}

/// Summarises a student's progress from their submitted exam ids and their published results.
/// Unpublished results must already be filtered out by the caller.
pub(crate) fn summarize(submitted_exam_ids: &[String], published: &[ExamResult]) -> StudentSummary {
    StudentSummary {
        completed_exams: distinct_count(submitted_exam_ids),
        total_submissions: submitted_exam_ids.len(),
        average_percentage: average_percentage(published.iter().map(|result| result.percentage)),
    }
}

pub(crate) fn average_percentage(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0_u32), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        return None;
    }

    Some(round2(sum / f64::from(count)))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn distinct_count(ids: &[String]) -> usize {
    ids.iter().collect::<HashSet<_>>().len()
}
