//! Administrative handlers

use crate::handlers::AppState;
use crate::models::ApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

/// Get dashboard statistics
pub async fn get_dashboard_stats(State(state): State<AppState>) -> impl IntoResponse {
    let by_status = state.store.counts_by_status().await.unwrap_or_default();
    let stats_map: HashMap<String, i64> = by_status.into_iter().collect();

    let total_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&state.pool)
        .await
        .unwrap_or(0);

    let total_users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = TRUE")
            .fetch_one(&state.pool)
            .await
            .unwrap_or(0);

    let pending_reviews: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE status = 'pending'")
            .fetch_one(&state.pool)
            .await
            .unwrap_or(0);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "documentsByStatus": stats_map,
            "totalDocuments": total_documents,
            "activeUsers": total_users,
            "pendingReviews": pending_reviews,
        }))),
    )
}
