//! Document store
//!
//! Owns document entities and their embedded sub-collections (versions,
//! ratings, comments, likes). Sub-collection writes are single atomic
//! statements so concurrent mutations to the same document cannot lose
//! updates; concurrent mutations to different documents never conflict.

use crate::models::{
    Document, DocumentComment, DocumentRating, DocumentStatus, DocumentVersion, MetadataPair,
};
use crate::similarity::CorpusTitle;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Whole-string matching key: what "the same title" means for the
/// create-or-append decision (case-insensitive, trimmed).
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Fields the lifecycle manager resolves before a document is created.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub region: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataPair>,
    pub status: DocumentStatus,
    pub is_sensitive: bool,
    pub compliance_notes: Option<String>,
    pub file_urls: Vec<String>,
    pub changelog: Option<String>,
    pub uploader_id: Uuid,
    pub is_duplicate_warning: bool,
    pub similar_document_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilters {
    pub status: Option<DocumentStatus>,
    pub domain: Option<String>,
    pub search: Option<String>,
    pub uploader_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewDocument) -> Result<Document, sqlx::Error> {
        let slug: String = sqlx::query_scalar("SELECT generate_document_slug()")
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|_| {
                format!(
                    "kb-{}-{}",
                    Utc::now().format("%Y%m%d"),
                    &Uuid::new_v4().to_string()[..5]
                )
            });

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                slug, title, title_norm, description, domain, region, tags, metadata,
                status, is_sensitive, compliance_notes, file_urls, uploader_id,
                is_duplicate_warning, similar_document_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&slug)
        .bind(&input.title)
        .bind(normalize_title(&input.title))
        .bind(&input.description)
        .bind(&input.domain)
        .bind(&input.region)
        .bind(&input.tags)
        .bind(sqlx::types::Json(&input.metadata))
        .bind(input.status)
        .bind(input.is_sensitive)
        .bind(&input.compliance_notes)
        .bind(&input.file_urls)
        .bind(input.uploader_id)
        .bind(input.is_duplicate_warning)
        .bind(input.similar_document_id)
        .fetch_one(&self.pool)
        .await?;

        // A document created with an attachment starts at version 1; one
        // created without any file starts with an empty history.
        if let Some(first_file) = input.file_urls.first() {
            sqlx::query(
                r#"
                INSERT INTO document_versions (document_id, version_num, file_url, changelog, created_by)
                VALUES ($1, 1, $2, $3, $4)
                "#,
            )
            .bind(document.id)
            .bind(first_file)
            .bind(&input.changelog)
            .bind(input.uploader_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(document)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Whole-string case-insensitive title match (the create-or-append key).
    pub async fn find_by_title(&self, title: &str) -> Result<Option<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE title_norm = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(normalize_title(title))
        .fetch_optional(&self.pool)
        .await
    }

    /// Full title corpus for the similarity scan.
    pub async fn all_titles(&self) -> Result<Vec<CorpusTitle>, sqlx::Error> {
        let rows: Vec<(Uuid, String, String)> =
            sqlx::query_as("SELECT id, slug, title FROM documents ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(document_id, slug, title)| CorpusTitle {
                document_id,
                slug,
                title,
            })
            .collect())
    }

    pub async fn list(
        &self,
        filters: &DocumentFilters,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Document>, i64), sqlx::Error> {
        let offset = (page - 1) * per_page;
        let search_pattern = filters.search.as_ref().map(|s| format!("%{}%", s));

        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE ($1::document_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR domain = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
              AND ($4::uuid IS NULL OR uploader_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filters.status)
        .bind(&filters.domain)
        .bind(&search_pattern)
        .bind(filters.uploader_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE ($1::document_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR domain = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
              AND ($4::uuid IS NULL OR uploader_id = $4)
            "#,
        )
        .bind(filters.status)
        .bind(&filters.domain)
        .bind(&search_pattern)
        .bind(filters.uploader_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((documents, total))
    }

    /// Append the next version entry.
    ///
    /// The version number is computed and inserted in one statement; the
    /// (document_id, version_num) unique index turns a concurrent append
    /// into a retryable conflict instead of a duplicate number.
    pub async fn append_version(
        &self,
        document_id: Uuid,
        file_url: Option<&str>,
        changelog: Option<&str>,
        created_by: Uuid,
    ) -> Result<DocumentVersion, sqlx::Error> {
        const MAX_ATTEMPTS: u32 = 3;

        let mut attempt = 0;
        let version = loop {
            attempt += 1;
            let result = sqlx::query_as::<_, DocumentVersion>(
                r#"
                INSERT INTO document_versions (document_id, version_num, file_url, changelog, created_by)
                SELECT $1, COALESCE(MAX(version_num), 0) + 1, $2, $3, $4
                FROM document_versions WHERE document_id = $1
                RETURNING *
                "#,
            )
            .bind(document_id)
            .bind(file_url)
            .bind(changelog)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(version) => break version,
                Err(e) if attempt < MAX_ATTEMPTS && is_unique_violation(&e) => continue,
                Err(e) => return Err(e),
            }
        };

        if let Some(url) = file_url {
            sqlx::query(
                "UPDATE documents SET file_urls = array_append(file_urls, $2), updated_at = NOW() WHERE id = $1",
            )
            .bind(document_id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE documents SET updated_at = NOW() WHERE id = $1")
                .bind(document_id)
                .execute(&self.pool)
                .await?;
        }

        Ok(version)
    }

    pub async fn versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, sqlx::Error> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = $1 ORDER BY version_num",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn add_comment(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        body: &str,
    ) -> Result<DocumentComment, sqlx::Error> {
        sqlx::query_as::<_, DocumentComment>(
            r#"
            INSERT INTO document_comments (document_id, user_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn comments(&self, document_id: Uuid) -> Result<Vec<DocumentComment>, sqlx::Error> {
        sqlx::query_as::<_, DocumentComment>(
            "SELECT * FROM document_comments WHERE document_id = $1 ORDER BY created_at",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn delete_comment(
        &self,
        document_id: Uuid,
        comment_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM document_comments WHERE id = $1 AND document_id = $2",
        )
        .bind(comment_id)
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Toggle a user's like. Returns the new state and the new count.
    pub async fn toggle_like(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<(bool, i64), sqlx::Error> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO document_likes (document_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let liked = if inserted > 0 {
            true
        } else {
            sqlx::query("DELETE FROM document_likes WHERE document_id = $1 AND user_id = $2")
                .bind(document_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            false
        };

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM document_likes WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((liked, count))
    }

    pub async fn like_count(&self, document_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM document_likes WHERE document_id = $1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Insert or overwrite a user's rating, then recompute the average.
    /// Returns the new average (0 when no ratings remain).
    pub async fn upsert_rating(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        rating: i32,
    ) -> Result<f32, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO document_ratings (document_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (document_id, user_id)
            DO UPDATE SET rating = EXCLUDED.rating, rated_at = NOW()
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        let average: f32 = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET average_rating = COALESCE(
                    (SELECT AVG(rating)::real FROM document_ratings WHERE document_id = $1), 0),
                updated_at = NOW()
            WHERE id = $1
            RETURNING average_rating
            "#,
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(average)
    }

    pub async fn ratings(&self, document_id: Uuid) -> Result<Vec<DocumentRating>, sqlx::Error> {
        sqlx::query_as::<_, DocumentRating>(
            "SELECT * FROM document_ratings WHERE document_id = $1 ORDER BY rated_at",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Move a document to a review target status, stamping the reviewer.
    ///
    /// rejection_reason is persisted only when the target is Rejected.
    /// Returns None when the document does not exist.
    pub async fn apply_status_transition(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
        reviewer_id: Uuid,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Document>, sqlx::Error> {
        debug_assert!(status.is_review_target());

        let reason = if status == DocumentStatus::Rejected {
            rejection_reason
        } else {
            None
        };

        sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET status = $2, reviewed_by = $3, reviewed_at = NOW(),
                rejection_reason = COALESCE($4, rejection_reason),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(status)
        .bind(reviewer_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    /// Governance compliance flag, independent of the review transition.
    pub async fn set_compliance_flag(
        &self,
        document_id: Uuid,
        reason: &str,
    ) -> Result<Option<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET compliance_flag = TRUE, flag_reason = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    /// Hard delete; version/rating/comment/like rows go with the document.
    pub async fn delete(&self, document_id: Uuid) -> Result<Option<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = $1 RETURNING *")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn counts_by_status(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT status::text, COUNT(*) FROM documents GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Intro to X  "), "intro to x");
        assert_eq!(normalize_title("INTRO TO X"), "intro to x");
        assert_eq!(normalize_title("intro to x"), "intro to x");
    }

    #[test]
    fn test_normalized_titles_collide_across_case() {
        assert_eq!(normalize_title("Intro to X"), normalize_title("intro to x"));
    }
}
