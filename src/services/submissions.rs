use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::types::ExamStatus;
use crate::repositories;

pub(crate) const REQUIRED_FILE_SUFFIX: &str = ".pdf";

#[derive(Debug, Error)]
pub(crate) enum SubmitError {
    #[error("Submissions must be a PDF file.")]
    InvalidFile,
    #[error("Answers must be a JSON object")]
    InvalidAnswers,
    #[error("Exam not found")]
    ExamNotFound,
    #[error("This exam is not accepting submissions")]
    NotAccepting(ExamStatus),
    #[error("Already submitted this exam")]
    AlreadySubmitted,
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Persistence operations submission intake needs. The unique (exam, student) constraint
/// behind `insert_if_absent` is the real duplicate guard; `has_submission` only lets the
/// common case fail early.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn exam_status(&self, exam_id: &str) -> anyhow::Result<Option<ExamStatus>>;

    async fn has_submission(&self, exam_id: &str, student_id: &str) -> anyhow::Result<bool>;

    async fn insert_if_absent(&self, submission: NewSubmission<'_>) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
pub(crate) struct NewSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) answers: &'a Value,
    pub(crate) file_url: Option<&'a str>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionRequest<'a> {
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) answers: &'a Value,
    pub(crate) file_url: Option<&'a str>,
}

pub(crate) fn validate_file_url(file_url: Option<&str>) -> Result<(), SubmitError> {
    match file_url {
        Some(url) if !url.ends_with(REQUIRED_FILE_SUFFIX) => Err(SubmitError::InvalidFile),
        _ => Ok(()),
    }
}

/// Records a student's submission and returns its id.
///
/// Shape checks run before any lookup, so a malformed request is rejected the same way
/// whatever the state of the exam. The remaining checks run in order: exam exists, exam is
/// open, no earlier submission.
pub(crate) async fn submit<S: SubmissionStore + ?Sized>(
    store: &S,
    request: SubmissionRequest<'_>,
    now: PrimitiveDateTime,
) -> Result<String, SubmitError> {
    validate_file_url(request.file_url)?;
    if !request.answers.is_object() {
        return Err(SubmitError::InvalidAnswers);
    }

    let status =
        store.exam_status(request.exam_id).await?.ok_or(SubmitError::ExamNotFound)?;
    if !status.accepts_submissions() {
        return Err(SubmitError::NotAccepting(status));
    }

    if store.has_submission(request.exam_id, request.student_id).await? {
        return Err(SubmitError::AlreadySubmitted);
    }

    let id = Uuid::new_v4().to_string();
    let inserted = store
        .insert_if_absent(NewSubmission {
            id: &id,
            exam_id: request.exam_id,
            student_id: request.student_id,
            answers: request.answers,
            file_url: request.file_url,
            submitted_at: now,
        })
        .await?;

    if !inserted {
        return Err(SubmitError::AlreadySubmitted);
    }

    Ok(id)
}

#[async_trait]
impl SubmissionStore for PgPool {
    async fn exam_status(&self, exam_id: &str) -> anyhow::Result<Option<ExamStatus>> {
        Ok(repositories::exams::find_status(self, exam_id).await?)
    }

    async fn has_submission(&self, exam_id: &str, student_id: &str) -> anyhow::Result<bool> {
        Ok(repositories::submissions::exists_for_student(self, exam_id, student_id).await?)
    }

    async fn insert_if_absent(&self, submission: NewSubmission<'_>) -> anyhow::Result<bool> {
        let created = repositories::submissions::create_if_absent(
            self,
            repositories::submissions::NewSubmission {
                id: submission.id,
                exam_id: submission.exam_id,
                student_id: submission.student_id,
                answers: submission.answers,
                file_url: submission.file_url,
                submitted_at: submission.submitted_at,
            },
        )
        .await?;
        Ok(created.is_some())
    }
}
