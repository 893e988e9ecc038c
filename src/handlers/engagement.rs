//! Rating, comment and like handlers

use crate::handlers::{error_response, AppState};
use crate::models::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// Rate a document (1-5); re-rating overwrites the previous value
pub async fn rate_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RateDocumentRequest>,
) -> impl IntoResponse {
    match state.lifecycle.rate(id, input).await {
        Ok(average_rating) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "averageRating": average_rating,
            }))),
        ),
        Err(e) => error_response(e),
    }
}

/// Add a comment to a document
pub async fn comment_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentRequest>,
) -> impl IntoResponse {
    match state.lifecycle.comment(id, input).await {
        Ok(comment) => (StatusCode::CREATED, Json(ApiResponse::success(comment))),
        Err(e) => error_response(e),
    }
}

/// Delete a single comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.lifecycle.delete_comment(id, comment_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => error_response(e),
    }
}

/// Toggle a like on a document
pub async fn like_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<LikeRequest>,
) -> impl IntoResponse {
    match state.lifecycle.toggle_like(id, input.user_id).await {
        Ok(receipt) => (StatusCode::OK, Json(ApiResponse::success(receipt))),
        Err(e) => error_response(e),
    }
}
