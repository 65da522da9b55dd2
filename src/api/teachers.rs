use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{ensure_exam_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, Profile};
use crate::db::types::{ExamStatus, SubmissionStatus, UserRole};
use crate::repositories;
use crate::schemas::dashboard::TeacherDashboard;
use crate::schemas::exam::{
    ExamCreate, ExamResponse, ExamUpdate, ExamWithQuestionsResponse, QuestionCreate,
    QuestionResponse,
};
use crate::schemas::result::{PublishResponse, ResultResponse};
use crate::schemas::submission::{EvaluateSubmission, SubmissionResponse};
use crate::schemas::MessageResponse;
use crate::services::evaluation;

const RECENT_EXAMS: i64 = 5;
const EXAM_HAS_SUBMISSIONS: &str = "Cannot delete an exam that already has submissions";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/exams", post(create_exam).get(list_exams))
        .route("/exams/:exam_id", get(get_exam).put(update_exam).delete(delete_exam))
        .route("/exams/:exam_id/questions", post(create_question))
        .route("/exams/:exam_id/submissions", get(list_submissions))
        .route("/exams/:exam_id/publish", post(publish_results))
        .route("/questions/:question_id", delete(delete_question))
        .route("/submissions/:submission_id/evaluate", post(evaluate_submission))
}

/// Teacher id to filter by; admins see every exam.
fn owner_scope(profile: &Profile) -> Option<&str> {
    if profile.role == UserRole::Admin {
        None
    } else {
        Some(profile.id.as_str())
    }
}

async fn load_owned_exam(
    state: &AppState,
    teacher: &Profile,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    ensure_exam_owner(teacher, &exam.teacher_id)?;
    Ok(exam)
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<TeacherDashboard>, ApiError> {
    let scope = owner_scope(&teacher);
    let db = state.db();

    let total_exams = repositories::exams::count(db, scope, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;
    let active_exams = repositories::exams::count(db, scope, Some(ExamStatus::Active))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;
    let total_submissions = repositories::submissions::count(db, scope, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
    let pending_evaluations =
        repositories::submissions::count(db, scope, Some(SubmissionStatus::Submitted))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
    let recent = repositories::exams::list(db, scope, Some(RECENT_EXAMS))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(TeacherDashboard {
        total_exams,
        active_exams,
        total_submissions,
        pending_evaluations,
        recent_exams: recent.into_iter().map(ExamResponse::from_db).collect(),
    }))
}

async fn create_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            subject: &payload.subject,
            description: payload.description.as_deref(),
            teacher_id: &teacher.id,
            scheduled_at: payload.scheduled_at,
            duration_minutes: payload.duration_minutes,
            total_marks: payload.total_marks,
            status: ExamStatus::Draft,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    tracing::info!(exam_id = %exam.id, teacher_id = %teacher.id, "Created exam");

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

async fn list_exams(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let exams = repositories::exams::list(state.db(), owner_scope(&teacher), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(ExamResponse::from_db).collect()))
}

async fn get_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamWithQuestionsResponse>, ApiError> {
    let exam = load_owned_exam(&state, &teacher, &exam_id).await?;
    let questions = repositories::questions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(ExamWithQuestionsResponse {
        exam: ExamResponse::from_db(exam),
        questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
    }))
}

async fn update_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let mut exam = load_owned_exam(&state, &teacher, &exam_id).await?;
    payload.apply(&mut exam);

    let exam = repositories::exams::update(state.db(), &exam, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn delete_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    load_owned_exam(&state, &teacher, &exam_id).await?;

    let submitted = repositories::submissions::exists_for_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam submissions"))?;
    if submitted {
        return Err(ApiError::Conflict(EXAM_HAS_SUBMISSIONS.to_string()));
    }

    repositories::exams::delete_by_id(state.db(), &exam_id).await.map_err(|e| {
        if crate::db::is_foreign_key_violation(&e) {
            ApiError::Conflict(EXAM_HAS_SUBMISSIONS.to_string())
        } else {
            ApiError::internal(e, "Failed to delete exam")
        }
    })?;

    tracing::info!(exam_id = %exam_id, "Deleted exam");
    Ok(Json(MessageResponse { message: "Exam deleted".to_string() }))
}

async fn create_question(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    load_owned_exam(&state, &teacher, &exam_id).await?;

    let question = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam_id,
            question_text: &payload.question_text,
            question_type: payload.question_type,
            options: payload.options,
            correct_answer: payload.correct_answer.as_deref(),
            marks: payload.marks,
            order_num: payload.order_num,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

async fn delete_question(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(question_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    load_owned_exam(&state, &teacher, &question.exam_id).await?;

    repositories::questions::delete_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    Ok(Json(MessageResponse { message: "Question deleted".to_string() }))
}

async fn list_submissions(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    load_owned_exam(&state, &teacher, &exam_id).await?;

    let submissions = repositories::submissions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    let student_ids: Vec<String> = submissions
        .iter()
        .map(|submission| submission.student_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let students: HashMap<String, (String, Option<String>)> =
        repositories::profiles::list_names_by_ids(state.db(), &student_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student names"))?
            .into_iter()
            .map(|(id, name, reg_number)| (id, (name, reg_number)))
            .collect();

    let response = submissions
        .into_iter()
        .map(|submission| {
            let student = students.get(&submission.student_id).cloned();
            let mut item = SubmissionResponse::from_db(submission);
            if let Some((name, reg_number)) = student {
                item.student_name = Some(name);
                item.reg_number = reg_number;
            }
            item
        })
        .collect();

    Ok(Json(response))
}

async fn evaluate_submission(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(submission_id): Path<String>,
    Json(payload): Json<EvaluateSubmission>,
) -> Result<Json<ResultResponse>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let submission = repositories::submissions::find_by_id(state.db(), &submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let exam = load_owned_exam(&state, &teacher, &submission.exam_id).await?;

    let score = evaluation::score(payload.marks_obtained, exam.total_marks)?;

    let result = repositories::results::upsert(
        state.db(),
        repositories::results::UpsertResult {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            student_id: &submission.student_id,
            submission_id: &submission.id,
            marks_obtained: payload.marks_obtained,
            total_marks: exam.total_marks,
            percentage: score.percentage,
            grade: score.grade,
            remarks: payload.remarks.as_deref(),
            evaluated_by: &teacher.id,
            evaluated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save result"))?;

    repositories::submissions::mark_evaluated(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update submission status"))?;

    tracing::info!(
        submission_id = %submission.id,
        exam_id = %exam.id,
        grade = score.grade,
        "Evaluated submission"
    );

    Ok(Json(ResultResponse::from_db(result, None)))
}

async fn publish_results(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<PublishResponse>, ApiError> {
    load_owned_exam(&state, &teacher, &exam_id).await?;

    let published = repositories::results::publish_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to publish results"))?;
    repositories::exams::set_status(
        state.db(),
        &exam_id,
        ExamStatus::ResultsPublished,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam status"))?;

    metrics::counter!("results_published_total").increment(published);
    tracing::info!(exam_id = %exam_id, published, "Published exam results");

    Ok(Json(PublishResponse { message: "Results published".to_string(), published }))
}
