use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ExamResult;

const COLUMNS: &str = "\
    id, exam_id, student_id, submission_id, marks_obtained, total_marks, percentage, grade, \
    remarks, evaluated_by, published, evaluated_at";

pub(crate) struct UpsertResult<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub student_id: &'a str,
    pub submission_id: &'a str,
    pub marks_obtained: i32,
    pub total_marks: i32,
    pub percentage: f64,
    pub grade: &'a str,
    pub remarks: Option<&'a str>,
    pub evaluated_by: &'a str,
    pub evaluated_at: PrimitiveDateTime,
}

/// Records an evaluation. Re-evaluating overwrites the marks and hides the result again until
/// the exam's results are published.
pub(crate) async fn upsert(pool: &PgPool, params: UpsertResult<'_>) -> Result<ExamResult, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "INSERT INTO results (
            id, exam_id, student_id, submission_id, marks_obtained, total_marks,
            percentage, grade, remarks, evaluated_by, published, evaluated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11)
        ON CONFLICT ON CONSTRAINT uq_results_exam_student DO UPDATE SET
            submission_id = EXCLUDED.submission_id,
            marks_obtained = EXCLUDED.marks_obtained,
            total_marks = EXCLUDED.total_marks,
            percentage = EXCLUDED.percentage,
            grade = EXCLUDED.grade,
            remarks = EXCLUDED.remarks,
            evaluated_by = EXCLUDED.evaluated_by,
            published = FALSE,
            evaluated_at = EXCLUDED.evaluated_at
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.submission_id)
    .bind(params.marks_obtained)
    .bind(params.total_marks)
    .bind(params.percentage)
    .bind(params.grade)
    .bind(params.remarks)
    .bind(params.evaluated_by)
    .bind(params.evaluated_at)
    .fetch_one(pool)
    .await
}

/// Published results of one student, newest evaluation first.
pub(crate) async fn list_published_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {COLUMNS} FROM results
         WHERE student_id = $1 AND published = TRUE
         ORDER BY evaluated_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn publish_by_exam(pool: &PgPool, exam_id: &str) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE results SET published = TRUE WHERE exam_id = $1 AND published = FALSE")
            .bind(exam_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
