//! # Session Repository
//!
//! One row per issued access token, keyed by the token's `jti`. A token is
//! honoured only while its row exists, is unrevoked, and has not expired,
//! so sign-out takes effect immediately even though the JWT itself is still
//! cryptographically valid.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    pub async fn create(&self, id: &str, user_id: &str, expires_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(user_id)
            .bind(Utc::now())
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        debug!(user_id, "Session opened");
        Ok(())
    }

    /// Whether the session exists for `user_id`, is unrevoked and unexpired.
    pub async fn is_active(&self, id: &str, user_id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let expires_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT expires_at FROM sessions WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expires_at.is_some_and(|exp| exp > now))
    }

    /// Revokes a session. Revoking twice is not an error.
    pub async fn revoke(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET revoked_at = ?2 WHERE id = ?1 AND revoked_at IS NULL")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!("Session revoked");
        Ok(())
    }

    /// Deletes expired or revoked sessions. Returns how many were removed.
    pub async fn purge(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1 OR revoked_at IS NOT NULL")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
