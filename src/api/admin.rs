use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::dashboard::AdminDashboard;
use crate::schemas::exam::ExamResponse;
use crate::schemas::user::{ProfileResponse, UserUpdate, UsersQuery};

const RECENT_EXAMS: i64 = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route("/users/:user_id", patch(update_user))
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<AdminDashboard>, ApiError> {
    let db = state.db();
    let count_error = |e: sqlx::Error| ApiError::internal(e, "Failed to load dashboard counts");

    let total_users = repositories::profiles::count(db, None).await.map_err(count_error)?;
    let total_teachers =
        repositories::profiles::count(db, Some(UserRole::Teacher)).await.map_err(count_error)?;
    let total_students =
        repositories::profiles::count(db, Some(UserRole::Student)).await.map_err(count_error)?;
    let total_exams = repositories::exams::count(db, None, None).await.map_err(count_error)?;
    let total_submissions =
        repositories::submissions::count(db, None, None).await.map_err(count_error)?;
    let recent = repositories::exams::list(db, None, Some(RECENT_EXAMS))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(AdminDashboard {
        total_users,
        total_teachers,
        total_students,
        total_exams,
        total_submissions,
        recent_exams: recent.into_iter().map(ExamResponse::from_db).collect(),
    }))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<ProfileResponse>>, ApiError> {
    let profiles = repositories::profiles::list(state.db(), query.role)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(profiles.into_iter().map(ProfileResponse::from_db).collect()))
}

async fn update_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(user_id): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    let profile = repositories::profiles::update(
        state.db(),
        &user_id,
        repositories::profiles::UpdateProfile {
            full_name: payload.full_name.as_deref(),
            role: payload.role,
            gender: payload.gender,
            department: payload.department.as_deref(),
            reg_number: payload.reg_number.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, user_id = %profile.id, "Updated user profile");

    Ok(Json(ProfileResponse::from_db(profile)))
}
