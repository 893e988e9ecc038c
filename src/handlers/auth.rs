//! Authentication handlers
//!
//! Session handling here is deliberately minimal: a random bearer token
//! stored as a SHA-256 digest with a fixed expiry. It gates nothing in
//! the core flows (those take explicit user ids) but keeps login/logout
//! visible in the audit trail.

use crate::handlers::AppState;
use crate::models::*;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Session cookie name
pub const SESSION_COOKIE: &str = "kh_session";

// =============================================================================
// Login / Logout
// =============================================================================

/// Log in with username and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match state.users.find_active_by_username(&input.username).await {
        Ok(Some(u)) => u,
        Ok(None) | Err(_) => {
            // Don't reveal whether the username exists
            return (
                StatusCode::UNAUTHORIZED,
                [(header::SET_COOKIE, "".to_string())],
                Json(ApiResponse::<UserResponse>::error(
                    "Invalid username or password",
                )),
            );
        }
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(h) => h,
        Err(_) => {
            tracing::error!("Invalid password hash in database for user {}", user.username);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::SET_COOKIE, "".to_string())],
                Json(ApiResponse::error("Authentication error")),
            );
        }
    };

    if Argon2::default()
        .verify_password(input.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::SET_COOKIE, "".to_string())],
            Json(ApiResponse::error("Invalid username or password")),
        );
    }

    let token = generate_session_token();
    let token_hash = hash_token(&token);
    let expires_at = Utc::now() + Duration::hours(state.session_expiry_hours);

    let session_result = sqlx::query(
        "INSERT INTO user_sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user.id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&state.pool)
    .await;

    if session_result.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::SET_COOKIE, "".to_string())],
            Json(ApiResponse::error("Failed to create session")),
        );
    }

    let _ = state.users.mark_login(user.id).await;

    state
        .audit
        .record(
            Some(user.id),
            AuditAction::Login,
            Some(user.id),
            "user",
            json!({ "username": user.username }),
        )
        .await;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE,
        token,
        state.session_expiry_hours * 3600
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(UserResponse::from(user))),
    )
}

/// Log out and invalidate the session
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_token(&token);

        let user_id: Option<Uuid> = sqlx::query_scalar(
            "DELETE FROM user_sessions WHERE token_hash = $1 RETURNING user_id",
        )
        .bind(&token_hash)
        .fetch_optional(&state.pool)
        .await
        .ok()
        .flatten();

        if let Some(user_id) = user_id {
            state
                .audit
                .record(Some(user_id), AuditAction::Logout, Some(user_id), "user", json!({}))
                .await;
        }
    }

    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0",
        SESSION_COOKIE
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(())),
    )
}

/// Get the currently logged-in user
pub async fn get_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match validate_session(&state.pool, &headers).await {
        Some(user) => (
            StatusCode::OK,
            Json(ApiResponse::success(UserResponse::from(user))),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ),
    }
}

// =============================================================================
// Session validation
// =============================================================================

pub async fn validate_session(pool: &PgPool, headers: &HeaderMap) -> Option<User> {
    let token = extract_session_token(headers)?;
    let token_hash = hash_token(&token);

    let user_id: Uuid = sqlx::query_scalar(
        "SELECT user_id FROM user_sessions WHERE token_hash = $1 AND expires_at > NOW()",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await
    .ok()??;

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .ok()?
}

// =============================================================================
// Password utilities
// =============================================================================

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

// =============================================================================
// Helper functions
// =============================================================================

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE)) {
            return Some(value.to_string());
        }
    }

    None
}

fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_deterministic() {
        let token = "abc123";
        assert_eq!(hash_token(token), hash_token(token));
    }

    #[test]
    fn test_hash_token_differs_per_token() {
        assert_ne!(hash_token("abc123"), hash_token("abc124"));
    }

    #[test]
    fn test_session_tokens_are_unique_and_hex() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_extract_session_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("other=1; {}=tok123; theme=dark", SESSION_COOKIE)
                .parse()
                .unwrap(),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));

        let empty = HeaderMap::new();
        assert!(extract_session_token(&empty).is_none());
    }
}
