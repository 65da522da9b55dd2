use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::Profile;
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) Profile);
pub(crate) struct CurrentStudent(pub(crate) Profile);
/// Teachers, and admins acting as teachers.
pub(crate) struct CurrentTeacher(pub(crate) Profile);
pub(crate) struct CurrentAdmin(pub(crate) Profile);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let profile = repositories::profiles::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load profile"))?;

        let Some(profile) = profile else {
            return Err(ApiError::Unauthorized("User profile not found"));
        };

        Ok(CurrentUser(profile))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[UserRole],
) -> Result<Profile, ApiError> {
    let CurrentUser(profile) = CurrentUser::from_request_parts(parts, state).await?;

    if allowed.contains(&profile.role) {
        Ok(profile)
    } else {
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Student]).await.map(CurrentStudent)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Teacher, UserRole::Admin]).await.map(CurrentTeacher)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[UserRole::Admin]).await.map(CurrentAdmin)
    }
}

/// Teachers may only manage their own exams; admins manage all of them.
pub(crate) fn ensure_exam_owner(profile: &Profile, teacher_id: &str) -> Result<(), ApiError> {
    if profile.role == UserRole::Admin || profile.id == teacher_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("You can only manage your own exams"))
    }
}
