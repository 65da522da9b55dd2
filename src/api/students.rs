use std::collections::{HashMap, HashSet};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamResult;
use crate::repositories;
use crate::schemas::dashboard::StudentDashboard;
use crate::schemas::exam::{
    AvailableExamResponse, ExamResponse, ExamWithQuestionsResponse, QuestionResponse,
};
use crate::schemas::result::{ResultExamInfo, ResultResponse};
use crate::schemas::submission::{
    SubmissionCreate, SubmitResponse, UploadUrlRequest, UploadUrlResponse,
};
use crate::services::{results_summary, submissions};

const RECENT_RESULTS: usize = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/exams", get(list_exams))
        .route("/exams/:exam_id", get(get_exam))
        .route("/exams/:exam_id/upload-url", post(upload_url))
        .route("/exams/:exam_id/submit", post(submit))
        .route("/results", get(list_results))
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<StudentDashboard>, ApiError> {
    let upcoming = repositories::exams::list_open(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let submitted = repositories::submissions::list_exam_ids_by_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let published = repositories::results::list_published_by_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let summary = results_summary::summarize(&submitted, &published);
    let recent: Vec<ExamResult> = published.into_iter().take(RECENT_RESULTS).collect();
    let recent_results = with_exam_info(&state, recent).await?;

    Ok(Json(StudentDashboard {
        upcoming_exams: upcoming.into_iter().map(ExamResponse::from_db).collect(),
        completed_exams: summary.completed_exams,
        total_submissions: summary.total_submissions,
        average_percentage: summary.average_percentage,
        recent_results,
    }))
}

async fn list_exams(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<Vec<AvailableExamResponse>>, ApiError> {
    let exams = repositories::exams::list_open(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let submitted: HashSet<String> =
        repositories::submissions::list_exam_ids_by_student(state.db(), &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?
            .into_iter()
            .collect();

    let teacher_ids: Vec<String> = exams
        .iter()
        .map(|exam| exam.teacher_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let teacher_names: HashMap<String, String> =
        repositories::profiles::list_names_by_ids(state.db(), &teacher_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load teacher names"))?
            .into_iter()
            .map(|(id, name, _)| (id, name))
            .collect();

    let response = exams
        .into_iter()
        .map(|exam| AvailableExamResponse {
            already_submitted: submitted.contains(&exam.id),
            teacher_name: teacher_names.get(&exam.teacher_id).cloned(),
            exam: ExamResponse::from_db(exam),
        })
        .collect();

    Ok(Json(response))
}

async fn get_exam(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamWithQuestionsResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if !exam.status.accepts_submissions() {
        return Err(ApiError::BadRequest("This exam is not available".to_string()));
    }

    let already = repositories::submissions::exists_for_student(state.db(), &exam_id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check submission"))?;
    if already {
        return Err(ApiError::Conflict("You have already submitted this exam".to_string()));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(ExamWithQuestionsResponse {
        exam: ExamResponse::from_db(exam),
        questions: questions.into_iter().map(QuestionResponse::for_student).collect(),
    }))
}

async fn upload_url(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
    Json(payload): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    submissions::validate_file_url(Some(&payload.filename))?;

    let Some(storage) = state.storage() else {
        return Err(ApiError::ServiceUnavailable("File storage is not configured".to_string()));
    };

    let status = repositories::exams::find_status(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;
    if !status.accepts_submissions() {
        return Err(ApiError::BadRequest("This exam is not accepting submissions".to_string()));
    }

    let key = format!(
        "submissions/{exam_id}/{}/{}{}",
        student.id,
        Uuid::new_v4(),
        submissions::REQUIRED_FILE_SUFFIX
    );
    let expires_in = state.settings().storage().presigned_url_expire_minutes * 60;
    let upload_url = storage
        .presign_put(&key, "application/pdf", Duration::from_secs(expires_in))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create upload URL"))?;

    Ok(Json(UploadUrlResponse {
        upload_url,
        file_url: state.settings().storage().public_url(&key),
        expires_in,
    }))
}

async fn submit(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let outcome = submissions::submit(
        state.db(),
        submissions::SubmissionRequest {
            exam_id: &exam_id,
            student_id: &student.id,
            answers: &payload.answers,
            file_url: payload.file_url.as_deref(),
        },
        primitive_now_utc(),
    )
    .await;

    let submission_id = match outcome {
        Ok(id) => id,
        Err(err) => {
            metrics::counter!("submissions_rejected_total").increment(1);
            return Err(err.into());
        }
    };

    metrics::counter!("submissions_created_total").increment(1);
    tracing::info!(
        exam_id = %exam_id,
        student_id = %student.id,
        submission_id = %submission_id,
        "Recorded submission"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse { message: "Exam submitted successfully".to_string(), submission_id }),
    ))
}

async fn list_results(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<Vec<ResultResponse>>, ApiError> {
    let published = repositories::results::list_published_by_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    Ok(Json(with_exam_info(&state, published).await?))
}

async fn with_exam_info(
    state: &AppState,
    results: Vec<ExamResult>,
) -> Result<Vec<ResultResponse>, ApiError> {
    let exam_ids: Vec<String> = results.iter().map(|result| result.exam_id.clone()).collect();
    let exams: HashMap<String, ResultExamInfo> =
        repositories::exams::list_summaries_by_ids(state.db(), &exam_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load exam details"))?
            .iter()
            .map(|row| (row.id.clone(), ResultExamInfo::from_row(row)))
            .collect();

    Ok(results
        .into_iter()
        .map(|result| {
            let exam = exams.get(&result.exam_id).cloned();
            ResultResponse::from_db(result, exam)
        })
        .collect())
}
