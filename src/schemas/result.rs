use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::ExamResult;
use crate::repositories::exams::ExamSummaryRow;

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) submission_id: Option<String>,
    pub(crate) marks_obtained: i32,
    pub(crate) total_marks: i32,
    pub(crate) percentage: Option<f64>,
    pub(crate) grade: Option<String>,
    pub(crate) remarks: Option<String>,
    pub(crate) evaluated_by: Option<String>,
    pub(crate) published: bool,
    pub(crate) evaluated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam: Option<ResultExamInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResultExamInfo {
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) total_marks: i32,
    pub(crate) scheduled_at: String,
}

impl ResultExamInfo {
    pub(crate) fn from_row(row: &ExamSummaryRow) -> Self {
        Self {
            title: row.title.clone(),
            subject: row.subject.clone(),
            total_marks: row.total_marks,
            scheduled_at: format_primitive(row.scheduled_at),
        }
    }
}

impl ResultResponse {
    pub(crate) fn from_db(result: ExamResult, exam: Option<ResultExamInfo>) -> Self {
        Self {
            id: result.id,
            exam_id: result.exam_id,
            student_id: result.student_id,
            submission_id: result.submission_id,
            marks_obtained: result.marks_obtained,
            total_marks: result.total_marks,
            percentage: result.percentage,
            grade: result.grade,
            remarks: result.remarks,
            evaluated_by: result.evaluated_by,
            published: result.published,
            evaluated_at: format_primitive(result.evaluated_at),
            exam,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishResponse {
    pub(crate) message: String,
    pub(crate) published: u64,
}
