//! User directory
//!
//! Read/write access to user accounts, their badge sets and onboarding
//! progress. Score mutation lives in the gamification engine.

use crate::models::{Badge, User, UserRole};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserDirectory {
    pool: PgPool,
}

impl UserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Login lookup: inactive users cannot authenticate.
    pub async fn find_active_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND is_active = TRUE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, display_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn badges(&self, user_id: Uuid) -> Result<Vec<Badge>, sqlx::Error> {
        sqlx::query_as::<_, Badge>(
            "SELECT name, earned_at FROM user_badges WHERE user_id = $1 ORDER BY earned_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Set onboarding progress, returning (previous, new) so the caller
    /// can detect the first crossing to 100.
    pub async fn update_onboarding(
        &self,
        user_id: Uuid,
        progress: i32,
    ) -> Result<Option<(i32, i32)>, sqlx::Error> {
        let previous: Option<i32> =
            sqlx::query_scalar("SELECT onboarding_progress FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let previous = match previous {
            Some(p) => p,
            None => return Ok(None),
        };

        sqlx::query("UPDATE users SET onboarding_progress = $2 WHERE id = $1")
            .bind(user_id)
            .bind(progress)
            .execute(&self.pool)
            .await?;

        Ok(Some((previous, progress)))
    }

    pub async fn mark_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
