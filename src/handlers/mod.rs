//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod documents;
pub mod engagement;
pub mod gamification;
pub mod middleware;
pub mod notifications;
pub mod users;

pub use admin::*;
pub use auth::*;
pub use documents::*;
pub use engagement::*;
pub use gamification::*;
pub use notifications::*;
pub use users::*;

use crate::audit::AuditSink;
use crate::gamification::GamificationEngine;
use crate::lifecycle::{LifecycleError, LifecycleManager};
use crate::models::ApiResponse;
use crate::notify::NotificationSink;
use crate::store::DocumentStore;
use crate::users::UserDirectory;
use axum::{http::StatusCode, Json};
use sqlx::PgPool;

/// Application state shared across handlers.
///
/// Every service is constructed once in main and injected here; handlers
/// never reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: DocumentStore,
    pub users: UserDirectory,
    pub engine: GamificationEngine,
    pub notifications: NotificationSink,
    pub audit: AuditSink,
    pub lifecycle: LifecycleManager,
    pub session_expiry_hours: i64,
    pub is_production: bool,
}

/// Translate a lifecycle error into the uniform response envelope.
pub(crate) fn error_response<T>(err: LifecycleError) -> (StatusCode, Json<ApiResponse<T>>) {
    match err {
        LifecycleError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg)))
        }
        LifecycleError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(ApiResponse::error(msg))),
        LifecycleError::Permission(msg) => (StatusCode::FORBIDDEN, Json(ApiResponse::error(msg))),
        LifecycleError::Database(e) => {
            tracing::error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}
