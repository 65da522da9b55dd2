use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::ExamStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, subject, description, teacher_id, scheduled_at, duration_minutes, \
    total_marks, status, created_at, updated_at";

/// Exam fields students see next to their results.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ExamSummaryRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) total_marks: i32,
    pub(crate) scheduled_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_status(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamStatus>, sqlx::Error> {
    sqlx::query_scalar::<_, ExamStatus>("SELECT status FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateExam<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub subject: &'a str,
    pub description: Option<&'a str>,
    pub teacher_id: &'a str,
    pub scheduled_at: PrimitiveDateTime,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub status: ExamStatus,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, subject, description, teacher_id, scheduled_at,
            duration_minutes, total_marks, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.subject)
    .bind(params.description)
    .bind(params.teacher_id)
    .bind(params.scheduled_at)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.status)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

/// Writes back every mutable column of an already merged exam.
pub(crate) async fn update(
    pool: &PgPool,
    exam: &Exam,
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = $1, subject = $2, description = $3, scheduled_at = $4,
            duration_minutes = $5, total_marks = $6, status = $7, updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}"
    ))
    .bind(&exam.title)
    .bind(&exam.subject)
    .bind(&exam.description)
    .bind(exam.scheduled_at)
    .bind(exam.duration_minutes)
    .bind(exam.total_marks)
    .bind(exam.status)
    .bind(now)
    .bind(&exam.id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn set_status(
    pool: &PgPool,
    id: &str,
    status: ExamStatus,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

/// Exams students can currently see, soonest first.
pub(crate) async fn list_open(pool: &PgPool) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE status IN ($1, $2) ORDER BY scheduled_at ASC"
    ))
    .bind(ExamStatus::OPEN[0])
    .bind(ExamStatus::OPEN[1])
    .fetch_all(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    teacher_id: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams"));
    if let Some(teacher_id) = teacher_id {
        builder.push(" WHERE teacher_id = ");
        builder.push_bind(teacher_id);
    }
    builder.push(" ORDER BY created_at DESC");
    if let Some(limit) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit.clamp(1, 1000));
    }

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    teacher_id: Option<&str>,
    status: Option<ExamStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams WHERE TRUE");
    if let Some(teacher_id) = teacher_id {
        builder.push(" AND teacher_id = ");
        builder.push_bind(teacher_id);
    }
    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_summaries_by_ids(
    pool: &PgPool,
    exam_ids: &[String],
) -> Result<Vec<ExamSummaryRow>, sqlx::Error> {
    if exam_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ExamSummaryRow>(
        "SELECT id, title, subject, total_marks, scheduled_at FROM exams WHERE id = ANY($1)",
    )
    .bind(exam_ids)
    .fetch_all(pool)
    .await
}
