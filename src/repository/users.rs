//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    auth::password::PasswordDigest,
    error::{AppError, AppResult},
    models::user::{User, UserRecord},
};

use super::UserStore;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    /// Get user by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, fullname, email, role, salt, hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by username (login)
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, fullname, email, role, salt, hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_by_username_and_email(&self, username: &str, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, fullname, email, role, salt, hash
            FROM users
            WHERE username = $1 AND email = $2
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a new user
    async fn create(&self, record: &UserRecord) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, fullname, email, role, salt, hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, fullname, email, role, salt, hash
            "#,
        )
        .bind(&record.username)
        .bind(&record.fullname)
        .bind(&record.email)
        .bind(record.role)
        .bind(&record.password.salt)
        .bind(&record.password.hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::Conflict("Username already taken. Choose another one.".to_string())
            }
            other => AppError::Database(other),
        })?;

        tracing::debug!(user_id = user.id, "Created user {}", user.username);
        Ok(user)
    }

    /// Update an existing user
    async fn update(&self, id: i32, record: &UserRecord) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, fullname = $3, email = $4, role = $5, salt = $6, hash = $7,
                modif_date = NOW()
            WHERE id = $1
            RETURNING id, username, fullname, email, role, salt, hash
            "#,
        )
        .bind(id)
        .bind(&record.username)
        .bind(&record.fullname)
        .bind(&record.email)
        .bind(record.role)
        .bind(&record.password.salt)
        .bind(&record.password.hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::Conflict("Username already taken. Choose another one.".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(user)
    }

    async fn update_password(&self, id: i32, password: &PasswordDigest) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET salt = $2, hash = $3, modif_date = NOW()
            WHERE id = $1
            RETURNING id, username, fullname, email, role, salt, hash
            "#,
        )
        .bind(id)
        .bind(&password.salt)
        .bind(&password.hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
