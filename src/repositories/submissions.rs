use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "id, exam_id, student_id, answers, file_url, status, submitted_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExpiredFileRow {
    pub(crate) id: String,
    pub(crate) file_url: String,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_for_student(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM submissions WHERE exam_id = $1 AND student_id = $2)",
    )
    .bind(exam_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn exists_for_exam(pool: &PgPool, exam_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM submissions WHERE exam_id = $1)")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct NewSubmission<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub student_id: &'a str,
    pub answers: &'a Value,
    pub file_url: Option<&'a str>,
    pub submitted_at: PrimitiveDateTime,
}

/// Inserts unless a submission for the same (exam, student) pair already exists. Returns the
/// new id, or `None` when the unique constraint kept the existing row.
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    params: NewSubmission<'_>,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO submissions (id, exam_id, student_id, answers, file_url, status, submitted_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT ON CONSTRAINT uq_submissions_exam_student DO NOTHING
         RETURNING id",
    )
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(Json(params.answers))
    .bind(params.file_url)
    .bind(SubmissionStatus::Submitted)
    .bind(params.submitted_at)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_exam_ids_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT exam_id FROM submissions WHERE student_id = $1")
        .bind(student_id)
        .fetch_all(pool)
        .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE exam_id = $1 ORDER BY submitted_at ASC"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Counts submissions, optionally restricted to exams of one teacher and to one status.
pub(crate) async fn count(
    pool: &PgPool,
    teacher_id: Option<&str>,
    status: Option<SubmissionStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM submissions s WHERE TRUE");
    if let Some(teacher_id) = teacher_id {
        builder.push(" AND s.exam_id IN (SELECT id FROM exams WHERE teacher_id = ");
        builder.push_bind(teacher_id);
        builder.push(")");
    }
    if let Some(status) = status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn mark_evaluated(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET status = $1 WHERE id = $2")
        .bind(SubmissionStatus::Evaluated)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Submissions past the retention cutoff that still reference a stored file, oldest first.
pub(crate) async fn list_expired_files(
    pool: &PgPool,
    cutoff: PrimitiveDateTime,
) -> Result<Vec<ExpiredFileRow>, sqlx::Error> {
    sqlx::query_as::<_, ExpiredFileRow>(
        "SELECT id, file_url
         FROM submissions
         WHERE submitted_at < $1 AND file_url IS NOT NULL
         ORDER BY submitted_at ASC",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

/// Drops the file reference and merges `marker` into the answers object. Non-object answers
/// are replaced by the marker.
pub(crate) async fn clear_file(
    pool: &PgPool,
    id: &str,
    marker: &Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions
         SET file_url = NULL,
             answers = CASE
                 WHEN jsonb_typeof(answers) = 'object' THEN answers || $1
                 ELSE $1
             END
         WHERE id = $2",
    )
    .bind(Json(marker))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
