//! Document lifecycle handlers

use crate::handlers::{error_response, AppState};
use crate::lifecycle::UploadOutcome;
use crate::models::*;
use crate::similarity::SimilarCandidate;
use crate::store::DocumentFilters;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Upload
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateWarningBody {
    pub candidates: Vec<SimilarCandidate>,
}

/// Upload a document (or a new version of an existing one)
pub async fn upload_document(
    State(state): State<AppState>,
    Json(input): Json<UploadDocumentRequest>,
) -> Response {
    match state.lifecycle.upload(input).await {
        Ok(UploadOutcome::Stored(receipt)) => {
            tracing::info!(
                "Document {} stored (new version: {})",
                receipt.document.slug,
                receipt.is_new_version
            );
            (StatusCode::CREATED, Json(ApiResponse::success(*receipt))).into_response()
        }
        Ok(UploadOutcome::DuplicateWarning { candidates }) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::outcome(
                "DUPLICATE_WARNING",
                "A document with a similar title already exists. \
                Resubmit with confirmDuplicate=true to proceed anyway.",
                DuplicateWarningBody { candidates },
            )),
        )
            .into_response(),
        Err(e) => error_response::<()>(e).into_response(),
    }
}

// =============================================================================
// Review
// =============================================================================

/// Approve, reject or archive a pending document
pub async fn review_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewDocumentRequest>,
) -> impl IntoResponse {
    match state.lifecycle.review(id, input).await {
        Ok(receipt) => {
            tracing::info!(
                "Document {} reviewed by {} ({:?})",
                receipt.id,
                receipt.reviewed_by,
                receipt.status
            );
            (StatusCode::OK, Json(ApiResponse::success(receipt)))
        }
        Err(e) => error_response(e),
    }
}

// =============================================================================
// Reads
// =============================================================================

/// Get a document with its versions, comments and engagement counts
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.lifecycle.document_detail(id).await {
        Ok(detail) => (StatusCode::OK, Json(ApiResponse::success(detail))),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<DocumentStatus>,
    pub domain: Option<String>,
    pub search: Option<String>,
    pub uploader_id: Option<Uuid>,
}

/// List documents with optional status/domain/search filters
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let filters = DocumentFilters {
        status: query.status,
        domain: query.domain,
        search: query.search,
        uploader_id: query.uploader_id,
    };

    match state.store.list(&filters, page, per_page).await {
        Ok((documents, total)) => {
            let items: Vec<DocumentResponse> =
                documents.into_iter().map(DocumentResponse::from).collect();
            let total_pages = (total as f64 / per_page as f64).ceil() as i64;

            (
                StatusCode::OK,
                Json(ApiResponse::success(PaginatedResponse {
                    items,
                    total,
                    page,
                    per_page,
                    total_pages,
                })),
            )
        }
        Err(e) => {
            tracing::error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckTitleQuery {
    pub title: String,
}

/// Dry-run the duplicate detector against the current corpus
pub async fn check_title(
    State(state): State<AppState>,
    Query(query): Query<CheckTitleQuery>,
) -> impl IntoResponse {
    match state.lifecycle.check_title(&query.title).await {
        Ok(candidates) => (
            StatusCode::OK,
            Json(ApiResponse::success(DuplicateWarningBody { candidates })),
        ),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// Governance / administration
// =============================================================================

/// Raise a governance compliance flag on a document
pub async fn flag_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<FlagDocumentRequest>,
) -> impl IntoResponse {
    match state
        .lifecycle
        .flag_compliance(id, input.user_id, input.reason.trim())
        .await
    {
        Ok(document) => (
            StatusCode::OK,
            Json(ApiResponse::success(DocumentResponse::from(document))),
        ),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentQuery {
    pub user_id: Uuid,
}

/// Delete a document and its version history (admin only)
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteDocumentQuery>,
) -> impl IntoResponse {
    match state.lifecycle.delete_document(id, query.user_id).await {
        Ok(deleted) => {
            tracing::info!("Document {} ({}) deleted", deleted.id, deleted.slug);
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "deleted": true,
                    "id": deleted.id,
                    "slug": deleted.slug,
                }))),
            )
        }
        Err(e) => error_response(e),
    }
}
