//! Data models for the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Consultant,
    SeniorConsultant,
    KnowledgeChampion,
    KnowledgeGovernanceCouncil,
    Admin,
    ItInfrastructure,
    HumanResources,
    Trainee,
}

impl UserRole {
    /// Roles permitted to move a document out of Pending.
    ///
    /// Exhaustive on purpose: adding a role forces a decision here.
    pub fn can_review(self) -> bool {
        match self {
            UserRole::KnowledgeGovernanceCouncil
            | UserRole::Admin
            | UserRole::SeniorConsultant
            | UserRole::ItInfrastructure => true,
            UserRole::Consultant
            | UserRole::KnowledgeChampion
            | UserRole::HumanResources
            | UserRole::Trainee => false,
        }
    }

    /// Roles notified when a document enters the Pending queue.
    pub fn reviews_pending_queue(self) -> bool {
        match self {
            UserRole::SeniorConsultant | UserRole::KnowledgeChampion => true,
            UserRole::Consultant
            | UserRole::KnowledgeGovernanceCouncil
            | UserRole::Admin
            | UserRole::ItInfrastructure
            | UserRole::HumanResources
            | UserRole::Trainee => false,
        }
    }

    /// Roles permitted to raise a governance compliance flag.
    pub fn can_flag_compliance(self) -> bool {
        match self {
            UserRole::KnowledgeGovernanceCouncil | UserRole::Admin => true,
            UserRole::Consultant
            | UserRole::SeniorConsultant
            | UserRole::KnowledgeChampion
            | UserRole::ItInfrastructure
            | UserRole::HumanResources
            | UserRole::Trainee => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Archived,
}

impl DocumentStatus {
    /// Only these statuses are reachable through the review transition.
    /// Draft and Pending are entered at creation or revision-request only.
    pub fn is_review_target(self) -> bool {
        matches!(
            self,
            DocumentStatus::Approved | DocumentStatus::Rejected | DocumentStatus::Archived
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "score_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScoreAction {
    Upload,
    Review,
    LikeReceived,
    Comment,
    TrainingComplete,
}

impl ScoreAction {
    /// Fixed point value per action kind.
    pub fn points(self) -> i32 {
        match self {
            ScoreAction::Upload => 10,
            ScoreAction::Review => 5,
            ScoreAction::LikeReceived => 2,
            ScoreAction::Comment => 1,
            ScoreAction::TrainingComplete => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    VersionUpdate,
    Approve,
    Reject,
    Archive,
    Delete,
    Login,
    Logout,
    BadgeEarned,
    ComplianceFlag,
    DuplicateDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DocumentPending,
    DocumentApproved,
    DocumentRejected,
    BadgeEarned,
    NewKnowledge,
    DocumentLiked,
    DocumentCommented,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub score: i32,
    pub onboarding_progress: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_or_username(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub score: i32,
    pub onboarding_progress: i32,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            score: user.score,
            onboarding_progress: user.onboarding_progress,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub name: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingRequest {
    pub progress: i32,
}

// =============================================================================
// Document
// =============================================================================

/// Arbitrary key-value metadata attached to a document; the compliance
/// checker reads these pairs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub title_norm: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub region: Option<String>,
    pub tags: Vec<String>,
    pub metadata: sqlx::types::Json<Vec<MetadataPair>>,
    pub status: DocumentStatus,
    pub is_sensitive: bool,
    pub compliance_notes: Option<String>,
    pub compliance_flag: bool,
    pub flag_reason: Option<String>,
    pub file_urls: Vec<String>,
    pub uploader_id: Uuid,
    pub average_rating: f32,
    pub is_duplicate_warning: bool,
    pub similar_document_id: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_num: i32,
    pub file_url: Option<String>,
    pub changelog: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentComment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRating {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub region: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataPair>,
    pub status: DocumentStatus,
    pub is_sensitive: bool,
    pub compliance_notes: Option<String>,
    pub compliance_flag: bool,
    pub flag_reason: Option<String>,
    pub file_urls: Vec<String>,
    pub uploader_id: Uuid,
    pub average_rating: f32,
    pub is_duplicate_warning: bool,
    pub similar_document_id: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            slug: doc.slug,
            title: doc.title,
            description: doc.description,
            domain: doc.domain,
            region: doc.region,
            tags: doc.tags,
            metadata: doc.metadata.0,
            status: doc.status,
            is_sensitive: doc.is_sensitive,
            compliance_notes: doc.compliance_notes,
            compliance_flag: doc.compliance_flag,
            flag_reason: doc.flag_reason,
            file_urls: doc.file_urls,
            uploader_id: doc.uploader_id,
            average_rating: doc.average_rating,
            is_duplicate_warning: doc.is_duplicate_warning,
            similar_document_id: doc.similar_document_id,
            reviewed_by: doc.reviewed_by,
            reviewed_at: doc.reviewed_at,
            rejection_reason: doc.rejection_reason,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Full document view: the entity plus its owned sub-collections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub versions: Vec<DocumentVersion>,
    pub comments: Vec<DocumentComment>,
    pub ratings: Vec<DocumentRating>,
    pub like_count: i64,
}

// =============================================================================
// Requests
// =============================================================================

/// Upload request body.
///
/// Clients historically sent tags/metadata either as JSON arrays or as
/// JSON-encoded strings (multipart forms), and confirmDuplicate as a bool
/// or the strings "true"/"false". The deserializers below accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    #[serde(default)]
    pub title: String,
    pub uploader_id: Option<Uuid>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub region: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "de_metadata_pairs")]
    pub metadata: Vec<MetadataPair>,
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_urls: Vec<String>,
    pub changelog: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub confirm_duplicate: bool,
}

impl UploadDocumentRequest {
    /// All attachment locators, whichever field the client used.
    pub fn all_file_urls(&self) -> Vec<String> {
        let mut urls = self.file_urls.clone();
        if let Some(ref single) = self.file_url {
            if !single.is_empty() && !urls.contains(single) {
                urls.insert(0, single.clone());
            }
        }
        urls
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDocumentRequest {
    pub user_id: Option<Uuid>,
    pub status: Option<DocumentStatus>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDocumentRequest {
    pub user_id: Uuid,
    pub rating: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub user_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDocumentRequest {
    pub user_id: Uuid,
    pub reason: String,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub ntype: NotificationType,
    pub title: String,
    pub message: String,
    pub related_document_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: None,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Machine-readable outcome the client can branch on, with a payload
    /// (e.g. DUPLICATE_WARNING carries the candidate list).
    pub fn outcome(code: &'static str, message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            code: Some(code),
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

// =============================================================================
// Lenient deserializers
// =============================================================================

fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Raw::List(list)) => Ok(list),
        Some(Raw::Encoded(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Raw::Encoded(s)) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
    }
}

fn de_metadata_pairs<'de, D>(deserializer: D) -> Result<Vec<MetadataPair>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<MetadataPair>),
        Encoded(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Raw::List(list)) => Ok(list),
        Some(Raw::Encoded(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Raw::Encoded(s)) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
    }
}

fn de_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Raw::Flag(b)) => Ok(b),
        Some(Raw::Text(s)) => Ok(s.trim().eq_ignore_ascii_case("true")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_roles() {
        assert!(UserRole::Admin.can_review());
        assert!(UserRole::KnowledgeGovernanceCouncil.can_review());
        assert!(UserRole::SeniorConsultant.can_review());
        assert!(UserRole::ItInfrastructure.can_review());
        assert!(!UserRole::Consultant.can_review());
        assert!(!UserRole::KnowledgeChampion.can_review());
        assert!(!UserRole::HumanResources.can_review());
        assert!(!UserRole::Trainee.can_review());
    }

    #[test]
    fn test_pending_queue_roles() {
        assert!(UserRole::SeniorConsultant.reviews_pending_queue());
        assert!(UserRole::KnowledgeChampion.reviews_pending_queue());
        assert!(!UserRole::Admin.reviews_pending_queue());
        assert!(!UserRole::Consultant.reviews_pending_queue());
    }

    #[test]
    fn test_review_targets() {
        assert!(DocumentStatus::Approved.is_review_target());
        assert!(DocumentStatus::Rejected.is_review_target());
        assert!(DocumentStatus::Archived.is_review_target());
        assert!(!DocumentStatus::Draft.is_review_target());
        assert!(!DocumentStatus::Pending.is_review_target());
    }

    #[test]
    fn test_score_action_points() {
        assert_eq!(ScoreAction::Upload.points(), 10);
        assert_eq!(ScoreAction::Review.points(), 5);
        assert_eq!(ScoreAction::LikeReceived.points(), 2);
        assert_eq!(ScoreAction::Comment.points(), 1);
        assert_eq!(ScoreAction::TrainingComplete.points(), 15);
    }

    #[test]
    fn test_upload_request_tags_as_array() {
        let req: UploadDocumentRequest =
            serde_json::from_str(r#"{"title":"Intro to X","tags":["rust","api"]}"#).unwrap();
        assert_eq!(req.tags, vec!["rust", "api"]);
    }

    #[test]
    fn test_upload_request_tags_as_encoded_string() {
        let req: UploadDocumentRequest =
            serde_json::from_str(r#"{"title":"Intro to X","tags":"[\"rust\",\"api\"]"}"#).unwrap();
        assert_eq!(req.tags, vec!["rust", "api"]);
    }

    #[test]
    fn test_upload_request_metadata_as_encoded_string() {
        let req: UploadDocumentRequest = serde_json::from_str(
            r#"{"title":"T","metadata":"[{\"key\":\"region\",\"value\":\"EU\"}]"}"#,
        )
        .unwrap();
        assert_eq!(req.metadata.len(), 1);
        assert_eq!(req.metadata[0].key, "region");
        assert_eq!(req.metadata[0].value, "EU");
    }

    #[test]
    fn test_upload_request_confirm_duplicate_variants() {
        let as_bool: UploadDocumentRequest =
            serde_json::from_str(r#"{"title":"T","confirmDuplicate":true}"#).unwrap();
        assert!(as_bool.confirm_duplicate);

        let as_string: UploadDocumentRequest =
            serde_json::from_str(r#"{"title":"T","confirmDuplicate":"true"}"#).unwrap();
        assert!(as_string.confirm_duplicate);

        let as_false_string: UploadDocumentRequest =
            serde_json::from_str(r#"{"title":"T","confirmDuplicate":"false"}"#).unwrap();
        assert!(!as_false_string.confirm_duplicate);

        let missing: UploadDocumentRequest = serde_json::from_str(r#"{"title":"T"}"#).unwrap();
        assert!(!missing.confirm_duplicate);
    }

    #[test]
    fn test_upload_request_merges_file_url_fields() {
        let req: UploadDocumentRequest = serde_json::from_str(
            r#"{"title":"T","fileUrl":"/files/a.pdf","fileUrls":["/files/b.pdf"]}"#,
        )
        .unwrap();
        assert_eq!(req.all_file_urls(), vec!["/files/a.pdf", "/files/b.pdf"]);
    }
}
