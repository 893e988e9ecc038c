//! Notification sink
//!
//! Fire-and-forget fan-out inserts. Delivery is whatever reads the
//! notifications table; the core only persists. Insert failures are
//! logged and never abort the operation that triggered them.

use crate::models::{Notification, NotificationType, UserRole};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationSink {
    pool: PgPool,
}

impl NotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn notify(
        &self,
        recipient_id: Uuid,
        ntype: NotificationType,
        title: &str,
        message: &str,
        related_document_id: Option<Uuid>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, ntype, title, message, related_document_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(recipient_id)
        .bind(ntype)
        .bind(title)
        .bind(message)
        .bind(related_document_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to insert notification for {}: {}", recipient_id, e);
        }
    }

    /// Fan out to every active user holding one of the given roles.
    pub async fn notify_roles(
        &self,
        roles: &[UserRole],
        ntype: NotificationType,
        title: &str,
        message: &str,
        related_document_id: Option<Uuid>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, ntype, title, message, related_document_id)
            SELECT id, $2, $3, $4, $5 FROM users
            WHERE is_active = TRUE AND role = ANY($1)
            "#,
        )
        .bind(roles)
        .bind(ntype)
        .bind(title)
        .bind(message)
        .bind(related_document_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to fan out notification to roles {:?}: {}", roles, e);
        }
    }

    /// Broadcast to all active users.
    pub async fn notify_all(
        &self,
        ntype: NotificationType,
        title: &str,
        message: &str,
        related_document_id: Option<Uuid>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, ntype, title, message, related_document_id)
            SELECT id, $1, $2, $3, $4 FROM users WHERE is_active = TRUE
            "#,
        )
        .bind(ntype)
        .bind(title)
        .bind(message)
        .bind(related_document_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to broadcast notification: {}", e);
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// is_read is the only mutable field on a notification.
    pub async fn mark_read(&self, notification_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
