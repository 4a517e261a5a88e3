//! Authentication and user account service

use crate::{
    auth::password,
    error::{AppError, AppResult},
    models::user::{User, UserForm, UserRecord},
    repository::Repository,
};

pub const INCORRECT_USERNAME: &str = "Incorrect username.";
pub const INCORRECT_PASSWORD: &str = "Incorrect password.";
pub const USERNAME_TAKEN: &str = "Username already taken. Choose another one.";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check a username/password pair.
    ///
    /// Failures are `AppError::Authentication` carrying the message to show
    /// on the login page.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication(INCORRECT_USERNAME.to_string()))?;

        if !password::validate_password(password, &user.salt, &user.hash) {
            tracing::info!(username, "Rejected login: wrong password");
            return Err(AppError::Authentication(INCORRECT_PASSWORD.to_string()));
        }

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.repository.users.get_by_id(id).await
    }

    /// Create an account from a validated registration form.
    ///
    /// The role is taken from the form as submitted.
    pub async fn register(&self, form: &UserForm) -> AppResult<User> {
        let record = UserRecord {
            username: form.username.clone(),
            fullname: form.fullname.clone(),
            email: form.email.clone(),
            role: form.role_value(),
            password: password::set_password(&form.password),
        };

        if self.repository.users.username_exists(&record.username).await? {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let user = self.repository.users.create(&record).await?;
        tracing::info!(user_id = user.id, role = user.role, "Registered user {}", user.username);
        Ok(user)
    }

    /// Rewrite a user's profile and password from a validated form
    pub async fn update_profile(&self, id: i32, form: &UserForm) -> AppResult<User> {
        let record = UserRecord {
            username: form.username.clone(),
            fullname: form.fullname.clone(),
            email: form.email.clone(),
            role: form.role_value(),
            password: password::set_password(&form.password),
        };

        self.repository
            .users
            .update(id, &record)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// First reset step: find the account matching both username and email
    pub async fn find_for_reset(&self, username: &str, email: &str) -> AppResult<Option<User>> {
        self.repository
            .users
            .get_by_username_and_email(username, email)
            .await
    }

    /// Final reset step: set a new password, leaving role and profile as they are
    pub async fn reset_password(&self, id: i32, new_password: &str) -> AppResult<User> {
        let digest = password::set_password(new_password);
        let user = self
            .repository
            .users
            .update_password(id, &digest)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = user.id, "Password reset");
        Ok(user)
    }
}
