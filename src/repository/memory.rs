//! In-memory user store, for tests and throwaway deployments

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::{
    auth::password::PasswordDigest,
    error::{AppError, AppResult},
    models::user::{User, UserRecord},
};

use super::UserStore;

#[derive(Default)]
struct Inner {
    next_id: i32,
    users: BTreeMap<i32, User>,
}

#[derive(Default)]
pub struct MemoryUsersRepository {
    inner: RwLock<Inner>,
}

impl MemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUsersRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_by_username_and_email(&self, username: &str, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username && u.email == email)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().any(|u| u.username == username))
    }

    async fn create(&self, record: &UserRecord) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == record.username) {
            return Err(AppError::Conflict(
                "Username already taken. Choose another one.".to_string(),
            ));
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            username: record.username.clone(),
            fullname: record.fullname.clone(),
            email: record.email.clone(),
            role: record.role,
            salt: record.password.salt.clone(),
            hash: record.password.hash.clone(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i32, record: &UserRecord) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.id != id && u.username == record.username)
        {
            return Err(AppError::Conflict(
                "Username already taken. Choose another one.".to_string(),
            ));
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        user.username = record.username.clone();
        user.fullname = record.fullname.clone();
        user.email = record.email.clone();
        user.role = record.role;
        user.salt = record.password.salt.clone();
        user.hash = record.password.hash.clone();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: i32, password: &PasswordDigest) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.salt = password.salt.clone();
            user.hash = password.hash.clone();
            user.clone()
        }))
    }
}
