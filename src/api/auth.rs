use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{RegisterResponse, TokenResponse};
use crate::schemas::user::{ProfileResponse, UserLogin, UserRegister};

/// Max attempts per window for auth endpoints (register/login).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    email: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{}", email.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserRegister>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    if payload.role == UserRole::Admin {
        return Err(ApiError::Forbidden("Admin accounts cannot be self-registered"));
    }

    enforce_rate_limit(
        &state,
        "register",
        &payload.email,
        "Too many registration attempts, try again later",
    )
    .await?;

    let existing = repositories::profiles::exists_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing profile"))?;
    if existing {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let user_id = state.identity().create_user(&payload.email, &payload.password).await?;

    let created = repositories::profiles::create(
        state.db(),
        repositories::profiles::CreateProfile {
            id: &user_id,
            email: &payload.email,
            full_name: &payload.full_name,
            role: payload.role,
            gender: payload.gender,
            department: payload.department.as_deref(),
            reg_number: payload.reg_number.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await;

    let profile = match created {
        Ok(profile) => profile,
        Err(err) => {
            discard_identity_user(&state, &user_id).await;
            return Err(if crate::db::is_unique_violation(&err) {
                ApiError::Conflict("User with this email already exists".to_string())
            } else {
                ApiError::internal(err, "Failed to create profile")
            });
        }
    };

    tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
            user: ProfileResponse::from_db(profile),
        }),
    ))
}

/// Profile creation failed after the provider account was made. Without the profile the account
/// would block every later registration with the same email.
async fn discard_identity_user(state: &AppState, user_id: &str) {
    match state.identity().delete_user(user_id).await {
        Ok(()) => tracing::warn!(user_id, "Removed identity account after profile creation failed"),
        Err(err) => tracing::error!(
            user_id,
            error = %err,
            "Identity account left without a profile; remove it manually"
        ),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(ApiError::validation)?;

    enforce_rate_limit(&state, "login", &payload.email, "Too many login attempts, try again later")
        .await?;

    let session = state.identity().sign_in(&payload.email, &payload.password).await?;

    let profile = repositories::profiles::find_by_id(state.db(), &session.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load profile"))?
        .ok_or(ApiError::Unauthorized("User profile not found"))?;

    Ok(Json(TokenResponse {
        access_token: session.access_token,
        token_type: "bearer".to_string(),
        user: ProfileResponse::from_db(profile),
    }))
}

async fn me(CurrentUser(profile): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from_db(profile))
}
