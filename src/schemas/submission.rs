use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionCreate {
    pub(crate) answers: Value,
    #[serde(default, alias = "fileUrl")]
    pub(crate) file_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) message: String,
    pub(crate) submission_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UploadUrlRequest {
    #[serde(alias = "fileName")]
    #[validate(length(min = 1, max = 255, message = "filename must be 1 to 255 characters"))]
    pub(crate) filename: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadUrlResponse {
    pub(crate) upload_url: String,
    pub(crate) file_url: String,
    pub(crate) expires_in: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) answers: Value,
    pub(crate) file_url: Option<String>,
    pub(crate) status: SubmissionStatus,
    pub(crate) submitted_at: String,
    pub(crate) student_name: Option<String>,
    pub(crate) reg_number: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            student_id: submission.student_id,
            answers: submission.answers.0,
            file_url: submission.file_url,
            status: submission.status,
            submitted_at: format_primitive(submission.submitted_at),
            student_name: None,
            reg_number: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EvaluateSubmission {
    #[serde(alias = "marksObtained")]
    #[validate(range(min = 0, message = "marks_obtained must be non-negative"))]
    pub(crate) marks_obtained: i32,
    #[serde(default)]
    pub(crate) remarks: Option<String>,
}
