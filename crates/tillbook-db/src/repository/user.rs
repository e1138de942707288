//! # User Repository
//!
//! Accounts for the auth gate. Password hashing happens in the server; this
//! repository only stores and returns the encoded hash.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::User;

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

/// A user together with the stored password hash, for sign-in only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    ///   (comparison ignores case)
    pub async fn create(&self, email: &str, password_hash: &str) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
                other => other,
            })?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Looks up an account by email (case-insensitive).
    pub async fn find_credentials(&self, email: &str) -> DbResult<Option<UserCredentials>> {
        debug!("Looking up credentials");

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1 COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let password_hash = r.password_hash.clone();
            UserCredentials {
                user: r.into_user(),
                password_hash,
            }
        }))
    }

    pub async fn get(&self, id: &str) -> DbResult<User> {
        sqlx::query_as::<_, UserRow>("SELECT id, email, password_hash, created_at FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserRow::into_user)
            .ok_or_else(|| DbError::not_found("User", id))
    }
}
