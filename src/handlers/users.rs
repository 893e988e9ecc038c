//! User account handlers

use crate::handlers::auth::hash_password;
use crate::handlers::{error_response, AppState};
use crate::models::*;
use crate::validation::{validate_create_user, validate_progress};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub badges: Vec<Badge>,
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_create_user(&input) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<UserResponse>::error(e.to_string())),
        );
    }

    let password_hash = match hash_password(&input.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to create user")),
            );
        }
    };

    let result = state
        .users
        .create(
            input.username.trim(),
            input.email.trim(),
            &password_hash,
            input.display_name.as_deref(),
            input.role,
        )
        .await;

    match result {
        Ok(user) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(UserResponse::from(user))),
        ),
        Err(e) if is_unique_violation(&e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Username or email already taken")),
        ),
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to create user")),
            )
        }
    }
}

/// Get a user's profile with badges
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let user = match state.users.find_by_id(id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("User not found")),
            )
        }
        Err(e) => {
            tracing::error!("Database error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            );
        }
    };

    let badges = state.users.badges(id).await.unwrap_or_default();

    (
        StatusCode::OK,
        Json(ApiResponse::success(UserProfileResponse {
            user: UserResponse::from(user),
            badges,
        })),
    )
}

/// Update onboarding progress; first reaching 100 pays the training bonus
pub async fn update_onboarding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<OnboardingRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_progress(input.progress) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(e.to_string())),
        );
    }

    match state.lifecycle.update_onboarding(id, input.progress).await {
        Ok(progress) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "onboardingProgress": progress,
            }))),
        ),
        Err(e) => error_response(e),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
