//! Document lifecycle manager
//!
//! Orchestrates the upload and review flows across the similarity
//! detector, compliance checker, document store, gamification engine and
//! the notification/audit sinks. All error translation to HTTP happens in
//! the handlers; nothing propagates past this boundary unhandled.
//!
//! Side effects follow an at-least-once model: once the primary document
//! mutation is committed, a later failure in scoring, notification or
//! audit fan-out is logged but never rolls the mutation back.

use crate::audit::AuditSink;
use crate::compliance::{check_compliance, ComplianceResult};
use crate::gamification::GamificationEngine;
use crate::models::{
    AuditAction, Badge, CommentRequest, Document, DocumentComment, DocumentDetailResponse,
    DocumentResponse, DocumentStatus, NotificationType, RateDocumentRequest,
    ReviewDocumentRequest, ScoreAction, UploadDocumentRequest, UserRole,
};
use crate::notify::NotificationSink;
use crate::similarity::{find_similar, SimilarCandidate, DEFAULT_THRESHOLD};
use crate::store::{DocumentStore, NewDocument};
use crate::users::UserDirectory;
use crate::validation::{
    validate_comment, validate_rating, validate_review, validate_upload, ValidationError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Error taxonomy
// =============================================================================

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl From<ValidationError> for LifecycleError {
    fn from(e: ValidationError) -> Self {
        LifecycleError::Validation(e.to_string())
    }
}

// =============================================================================
// Flow results
// =============================================================================

/// Successful upload: the stored document plus what happened around it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub document: DocumentResponse,
    pub is_new_version: bool,
    pub compliance_check: ComplianceResult,
    pub points_earned: i32,
    pub badges_earned: Vec<Badge>,
}

/// Upload outcome: either a stored document or the non-mutating
/// duplicate warning the client can override with confirmDuplicate.
#[derive(Debug)]
pub enum UploadOutcome {
    Stored(Box<UploadReceipt>),
    DuplicateWarning { candidates: Vec<SimilarCandidate> },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub id: Uuid,
    pub title: String,
    pub status: DocumentStatus,
    pub reviewed_by: String,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeReceipt {
    pub liked: bool,
    pub like_count: i64,
}

// =============================================================================
// Manager
// =============================================================================

/// Constructed once at startup; every collaborator is passed in
/// explicitly so tests can stand up the pieces independently.
#[derive(Clone)]
pub struct LifecycleManager {
    store: DocumentStore,
    users: UserDirectory,
    engine: GamificationEngine,
    notifications: NotificationSink,
    audit: AuditSink,
}

impl LifecycleManager {
    pub fn new(
        store: DocumentStore,
        users: UserDirectory,
        engine: GamificationEngine,
        notifications: NotificationSink,
        audit: AuditSink,
    ) -> Self {
        Self {
            store,
            users,
            engine,
            notifications,
            audit,
        }
    }

    // -------------------------------------------------------------------------
    // Upload flow
    // -------------------------------------------------------------------------

    pub async fn upload(
        &self,
        input: UploadDocumentRequest,
    ) -> Result<UploadOutcome, LifecycleError> {
        validate_upload(&input)?;
        let uploader_id = input
            .uploader_id
            .ok_or_else(|| LifecycleError::Validation("Field 'uploaderId' is required".into()))?;

        let uploader = self
            .users
            .find_by_id(uploader_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Uploader not found".into()))?;

        // Duplicate gate: a near-duplicate title short-circuits without
        // mutating anything unless the client explicitly confirmed.
        let corpus = self.store.all_titles().await?;
        let candidates = find_similar(&input.title, &corpus, DEFAULT_THRESHOLD);

        if !candidates.is_empty() && !input.confirm_duplicate {
            self.audit
                .record(
                    Some(uploader.id),
                    AuditAction::DuplicateDetected,
                    Some(candidates[0].document_id),
                    "document",
                    json!({
                        "title": input.title,
                        "matches": candidates.len(),
                        "topSimilarity": candidates[0].similarity_percent,
                    }),
                )
                .await;

            return Ok(UploadOutcome::DuplicateWarning { candidates });
        }

        let compliance = check_compliance(&input.metadata, input.region.as_deref());

        // Exact-title match plus an explicit confirmation means a new
        // version of the existing document, not a new document.
        let existing = self.store.find_by_title(&input.title).await?;

        let file_urls = input.all_file_urls();
        let (document, is_new_version) = match existing {
            Some(existing) if input.confirm_duplicate => {
                let file_url = file_urls.first().map(|s| s.as_str());
                if file_url.is_none() && input.changelog.is_none() {
                    return Err(LifecycleError::Validation(
                        "A new version needs a file or a changelog".into(),
                    ));
                }

                let version = self
                    .store
                    .append_version(
                        existing.id,
                        file_url,
                        input.changelog.as_deref(),
                        uploader.id,
                    )
                    .await?;

                self.audit
                    .record(
                        Some(uploader.id),
                        AuditAction::VersionUpdate,
                        Some(existing.id),
                        "document",
                        json!({
                            "title": existing.title,
                            "versionNum": version.version_num,
                        }),
                    )
                    .await;

                let document = self
                    .store
                    .find_by_id(existing.id)
                    .await?
                    .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

                (document, true)
            }
            _ => {
                let status = if compliance.passed {
                    DocumentStatus::Pending
                } else {
                    DocumentStatus::Rejected
                };

                let document = self
                    .store
                    .create(NewDocument {
                        title: input.title.clone(),
                        description: input.description.clone(),
                        domain: input.domain.clone(),
                        region: input.region.clone(),
                        tags: input.tags.clone(),
                        metadata: input.metadata.clone(),
                        status,
                        is_sensitive: compliance.is_sensitive,
                        compliance_notes: compliance.reason.clone(),
                        file_urls: file_urls.clone(),
                        changelog: input.changelog.clone(),
                        uploader_id: uploader.id,
                        is_duplicate_warning: !candidates.is_empty(),
                        similar_document_id: candidates.first().map(|c| c.document_id),
                    })
                    .await?;

                if !compliance.passed {
                    self.audit
                        .record(
                            Some(uploader.id),
                            AuditAction::ComplianceFlag,
                            Some(document.id),
                            "document",
                            json!({
                                "title": document.title,
                                "reason": compliance.reason,
                            }),
                        )
                        .await;
                }

                self.audit
                    .record(
                        Some(uploader.id),
                        AuditAction::Upload,
                        Some(document.id),
                        "document",
                        json!({ "title": document.title, "status": document.status }),
                    )
                    .await;

                (document, false)
            }
        };

        let (points_earned, badges_earned) = self
            .award_and_fan_out(
                uploader.id,
                ScoreAction::Upload,
                "Document upload",
                Some(document.id),
            )
            .await;

        if document.status == DocumentStatus::Pending {
            self.notifications
                .notify_roles(
                    &[UserRole::SeniorConsultant, UserRole::KnowledgeChampion],
                    NotificationType::DocumentPending,
                    "Document awaiting review",
                    &format!("\"{}\" was submitted and needs a review.", document.title),
                    Some(document.id),
                )
                .await;
        }

        Ok(UploadOutcome::Stored(Box::new(UploadReceipt {
            document: DocumentResponse::from(document),
            is_new_version,
            compliance_check: compliance,
            points_earned,
            badges_earned,
        })))
    }

    // -------------------------------------------------------------------------
    // Review flow
    // -------------------------------------------------------------------------

    pub async fn review(
        &self,
        document_id: Uuid,
        input: ReviewDocumentRequest,
    ) -> Result<ReviewReceipt, LifecycleError> {
        validate_review(&input)?;
        let reviewer_id = input
            .user_id
            .ok_or_else(|| LifecycleError::Validation("Field 'userId' is required".into()))?;
        let target_status = input
            .status
            .ok_or_else(|| LifecycleError::Validation("Field 'status' is required".into()))?;

        let reviewer = self
            .users
            .find_by_id(reviewer_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Reviewer not found".into()))?;

        if !reviewer.role.can_review() {
            return Err(LifecycleError::Permission(
                "Your role is not authorized to review documents".into(),
            ));
        }

        let document = self
            .store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;
        let previous_status = document.status;

        let updated = self
            .store
            .apply_status_transition(
                document_id,
                target_status,
                reviewer.id,
                input.rejection_reason.as_deref(),
            )
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        let action = match target_status {
            DocumentStatus::Approved => AuditAction::Approve,
            DocumentStatus::Rejected => AuditAction::Reject,
            // Draft/Pending are rejected by validate_review
            _ => AuditAction::Archive,
        };

        self.audit
            .record(
                Some(reviewer.id),
                action,
                Some(updated.id),
                "document",
                json!({
                    "title": updated.title,
                    "previousStatus": previous_status,
                    "newStatus": updated.status,
                }),
            )
            .await;

        match target_status {
            DocumentStatus::Approved => {
                // The approval bonus goes to the uploader, not the reviewer.
                self.award_and_fan_out(
                    updated.uploader_id,
                    ScoreAction::Upload,
                    "Document approved",
                    Some(updated.id),
                )
                .await;

                self.notifications
                    .notify(
                        updated.uploader_id,
                        NotificationType::DocumentApproved,
                        "Document approved",
                        &format!("\"{}\" was approved and is now published.", updated.title),
                        Some(updated.id),
                    )
                    .await;

                self.notifications
                    .notify_all(
                        NotificationType::NewKnowledge,
                        "New knowledge published",
                        &format!("\"{}\" is now available in the knowledge base.", updated.title),
                        Some(updated.id),
                    )
                    .await;
            }
            DocumentStatus::Rejected => {
                let reason = input
                    .rejection_reason
                    .as_deref()
                    .unwrap_or("No reason provided");
                self.notifications
                    .notify(
                        updated.uploader_id,
                        NotificationType::DocumentRejected,
                        "Document rejected",
                        &format!("\"{}\" was rejected: {}", updated.title, reason),
                        Some(updated.id),
                    )
                    .await;
            }
            _ => {}
        }

        // Reviewer credit feeds the reviews-performed counter (Mentor badge).
        self.award_and_fan_out(
            reviewer.id,
            ScoreAction::Review,
            "Review completed",
            Some(updated.id),
        )
        .await;

        Ok(ReviewReceipt {
            id: updated.id,
            title: updated.title,
            status: updated.status,
            reviewed_by: reviewer.display_or_username().to_string(),
            reviewed_at: updated.reviewed_at,
        })
    }

    // -------------------------------------------------------------------------
    // Engagement flows
    // -------------------------------------------------------------------------

    pub async fn rate(
        &self,
        document_id: Uuid,
        input: RateDocumentRequest,
    ) -> Result<f32, LifecycleError> {
        validate_rating(&input)?;

        self.users
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;
        self.store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        let average = self
            .store
            .upsert_rating(document_id, input.user_id, input.rating)
            .await?;

        Ok(average)
    }

    pub async fn comment(
        &self,
        document_id: Uuid,
        input: CommentRequest,
    ) -> Result<DocumentComment, LifecycleError> {
        validate_comment(&input)?;

        let commenter = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;
        let document = self
            .store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        let comment = self
            .store
            .add_comment(document_id, commenter.id, input.text.trim())
            .await?;

        self.award_and_fan_out(
            commenter.id,
            ScoreAction::Comment,
            "Comment posted",
            Some(document_id),
        )
        .await;

        if commenter.id != document.uploader_id {
            self.notifications
                .notify(
                    document.uploader_id,
                    NotificationType::DocumentCommented,
                    "New comment",
                    &format!(
                        "{} commented on \"{}\".",
                        commenter.display_or_username(),
                        document.title
                    ),
                    Some(document_id),
                )
                .await;
        }

        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        document_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), LifecycleError> {
        let deleted = self.store.delete_comment(document_id, comment_id).await?;
        if deleted {
            Ok(())
        } else {
            Err(LifecycleError::NotFound("Comment not found".into()))
        }
    }

    /// Toggle a like. Liking someone else's document pays the uploader;
    /// unliking and self-likes never touch the score.
    pub async fn toggle_like(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeReceipt, LifecycleError> {
        let liker = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;
        let document = self
            .store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        let (liked, like_count) = self.store.toggle_like(document_id, user_id).await?;

        if liked && liker.id != document.uploader_id {
            self.award_and_fan_out(
                document.uploader_id,
                ScoreAction::LikeReceived,
                "Like received",
                Some(document_id),
            )
            .await;

            self.notifications
                .notify(
                    document.uploader_id,
                    NotificationType::DocumentLiked,
                    "Document liked",
                    &format!(
                        "{} liked \"{}\".",
                        liker.display_or_username(),
                        document.title
                    ),
                    Some(document_id),
                )
                .await;
        }

        Ok(LikeReceipt { liked, like_count })
    }

    // -------------------------------------------------------------------------
    // Governance / administration
    // -------------------------------------------------------------------------

    pub async fn flag_compliance(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Document, LifecycleError> {
        let actor = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;

        if !actor.role.can_flag_compliance() {
            return Err(LifecycleError::Permission(
                "Your role is not authorized to flag documents".into(),
            ));
        }

        let document = self
            .store
            .set_compliance_flag(document_id, reason)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        self.audit
            .record(
                Some(actor.id),
                AuditAction::ComplianceFlag,
                Some(document.id),
                "document",
                json!({ "title": document.title, "reason": reason }),
            )
            .await;

        Ok(document)
    }

    pub async fn delete_document(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<Document, LifecycleError> {
        let actor = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;

        if actor.role != UserRole::Admin {
            return Err(LifecycleError::Permission(
                "Only administrators can delete documents".into(),
            ));
        }

        let deleted = self
            .store
            .delete(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        self.audit
            .record(
                Some(actor.id),
                AuditAction::Delete,
                Some(deleted.id),
                "document",
                json!({ "title": deleted.title, "slug": deleted.slug }),
            )
            .await;

        Ok(deleted)
    }

    /// First crossing of onboarding progress to 100 pays the training
    /// bonus; later writes of 100 do not.
    pub async fn update_onboarding(
        &self,
        user_id: Uuid,
        progress: i32,
    ) -> Result<i32, LifecycleError> {
        let (previous, current) = self
            .users
            .update_onboarding(user_id, progress)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("User not found".into()))?;

        if previous < 100 && current == 100 {
            self.award_and_fan_out(
                user_id,
                ScoreAction::TrainingComplete,
                "Onboarding training completed",
                None,
            )
            .await;
        }

        Ok(current)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn document_detail(
        &self,
        document_id: Uuid,
    ) -> Result<DocumentDetailResponse, LifecycleError> {
        let document = self
            .store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Document not found".into()))?;

        let versions = self.store.versions(document_id).await?;
        let comments = self.store.comments(document_id).await?;
        let ratings = self.store.ratings(document_id).await?;
        let like_count = self.store.like_count(document_id).await?;

        Ok(DocumentDetailResponse {
            document: DocumentResponse::from(document),
            versions,
            comments,
            ratings,
            like_count,
        })
    }

    /// Non-mutating similarity probe against the current corpus.
    pub async fn check_title(&self, title: &str) -> Result<Vec<SimilarCandidate>, LifecycleError> {
        let corpus = self.store.all_titles().await?;
        Ok(find_similar(title, &corpus, DEFAULT_THRESHOLD))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Award points and propagate any newly earned badges into audit
    /// entries and notifications. Failures here are logged, never fatal:
    /// the primary mutation has already been committed.
    async fn award_and_fan_out(
        &self,
        user_id: Uuid,
        action: ScoreAction,
        description: &str,
        related_document_id: Option<Uuid>,
    ) -> (i32, Vec<Badge>) {
        let outcome = match self
            .engine
            .award_points(user_id, action, description, related_document_id)
            .await
        {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                tracing::warn!("Points not awarded: user {} not found", user_id);
                return (0, Vec::new());
            }
            Err(e) => {
                tracing::warn!("Points not awarded for user {}: {}", user_id, e);
                return (0, Vec::new());
            }
        };

        for badge in &outcome.new_badges {
            self.audit
                .record(
                    Some(user_id),
                    AuditAction::BadgeEarned,
                    Some(user_id),
                    "user",
                    json!({ "badge": badge.name }),
                )
                .await;

            self.notifications
                .notify(
                    user_id,
                    NotificationType::BadgeEarned,
                    "Badge earned",
                    &format!("You earned the \"{}\" badge.", badge.name),
                    related_document_id,
                )
                .await;
        }

        (outcome.points, outcome.new_badges)
    }
}
