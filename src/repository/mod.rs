//! Repository layer for user records

pub mod memory;
pub mod users;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use crate::{
    auth::password::PasswordDigest,
    error::AppResult,
    models::user::{User, UserRecord},
};

/// Persistence operations on user records.
///
/// Usernames are unique; `create` reports a duplicate as a conflict.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>>;

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn get_by_username_and_email(&self, username: &str, email: &str) -> AppResult<Option<User>>;

    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    async fn create(&self, record: &UserRecord) -> AppResult<User>;

    /// Rewrite every field of an existing record; `None` if no such id
    async fn update(&self, id: i32, record: &UserRecord) -> AppResult<Option<User>>;

    /// Replace salt and hash only; `None` if no such id
    async fn update_password(&self, id: i32, password: &PasswordDigest) -> AppResult<Option<User>>;
}

/// Main repository struct holding the configured stores
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    /// Repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool)),
        }
    }

    /// Repository kept in process memory
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUsersRepository::default()),
        }
    }
}
