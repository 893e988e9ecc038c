//! Audit sink
//!
//! Append-only record keeper. Entries are never mutated or deleted.
//! A failed audit write is logged and does not fail the primary
//! operation (fail-open; see DESIGN.md).

use crate::models::AuditAction;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditSink {
    pool: PgPool,
}

impl AuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        actor_id: Option<Uuid>,
        action: AuditAction,
        target_id: Option<Uuid>,
        target_type: &str,
        details: serde_json::Value,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (actor_id, action, target_id, target_type, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(target_id)
        .bind(target_type)
        .bind(details)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to write audit entry ({:?}): {}", action, e);
        }
    }
}
