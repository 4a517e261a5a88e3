//! User model and form types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::{password::PasswordDigest, Role};

/// Full user record as persisted
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub fullname: String,
    pub email: String,
    /// Raw role value; see [`Role`] for the recognized levels
    pub role: i32,
    /// Hex-encoded salt, set together with `hash`
    pub salt: String,
    /// Hex-encoded PBKDF2 output
    pub hash: String,
}

impl User {
    pub fn url(&self) -> String {
        format!("/users/{}", self.id)
    }
}

/// Identity attached to an authenticated request.
///
/// Never carries password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: i32,
}

impl SessionUser {
    pub fn role_name(&self) -> Option<&'static str> {
        Role::try_from(self.role).ok().map(|r| r.as_str())
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Values for a new or rewritten user record
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: i32,
    pub password: PasswordDigest,
}

/// A single message shown on a form page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormError {
    pub msg: String,
}

impl FormError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Login form
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration and profile update form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserForm {
    #[validate(
        length(min = 3, message = "Username must be at least 3 characters long."),
        custom(function = "validate_username_chars")
    )]
    #[serde(default)]
    pub username: String,
    #[validate(
        length(min = 3, message = "Full name must be at least 3 characters long."),
        custom(function = "validate_alphanumeric_with_spaces")
    )]
    #[serde(default)]
    pub fullname: String,
    #[validate(email(message = "Please enter a valid email address."))]
    #[serde(default)]
    pub email: String,
    #[validate(custom(function = "validate_role"))]
    #[serde(default)]
    pub role: String,
    #[validate(
        length(min = 4, max = 32, message = "Password must be between 4-32 characters long."),
        custom(function = "validate_password_chars")
    )]
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl UserForm {
    const FIELDS: &'static [&'static str] = &["username", "fullname", "email", "role", "password"];

    /// Trim every field in place
    pub fn sanitize(mut self) -> Self {
        trim(&mut self.username);
        trim(&mut self.fullname);
        trim(&mut self.email);
        trim(&mut self.role);
        trim(&mut self.password);
        trim(&mut self.password_confirm);
        self
    }

    /// Validation messages in field order, plus the confirmation check
    pub fn errors(&self) -> Vec<FormError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_messages(&e, Self::FIELDS),
        };
        if !crate::auth::password::passwords_match(&self.password, &self.password_confirm) {
            errors.push(FormError::new("Passwords do not match."));
        }
        errors
    }

    /// Role value; only meaningful once validation passed
    pub fn role_value(&self) -> i32 {
        self.role.parse().unwrap_or(Role::Reader as i32)
    }

    /// Echo of the submitted values, without passwords
    pub fn echo(&self) -> FormUser {
        FormUser {
            id: None,
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            email: self.email.clone(),
            role: self.role.parse().ok(),
        }
    }
}

/// First step of the password reset: identify the account
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ResetRequestForm {
    #[validate(
        length(min = 3, message = "Username must be at least 3 characters long."),
        custom(function = "validate_username_chars")
    )]
    #[serde(default)]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    #[serde(default)]
    pub email: String,
}

impl ResetRequestForm {
    const FIELDS: &'static [&'static str] = &["username", "email"];

    pub fn sanitize(mut self) -> Self {
        trim(&mut self.username);
        trim(&mut self.email);
        self
    }

    pub fn errors(&self) -> Vec<FormError> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_messages(&e, Self::FIELDS),
        }
    }
}

/// Second step of the password reset: the new password
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ResetFinalForm {
    #[serde(default)]
    pub userid: String,
    #[validate(
        length(min = 4, max = 32, message = "Password must be between 4-32 characters long."),
        custom(function = "validate_password_chars")
    )]
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl ResetFinalForm {
    const FIELDS: &'static [&'static str] = &["password"];

    pub fn sanitize(mut self) -> Self {
        trim(&mut self.userid);
        trim(&mut self.password);
        trim(&mut self.password_confirm);
        self
    }

    pub fn errors(&self) -> Vec<FormError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_messages(&e, Self::FIELDS),
        };
        if !crate::auth::password::passwords_match(&self.password, &self.password_confirm) {
            errors.push(FormError::new("Passwords do not match."));
        }
        errors
    }
}

/// User fields echoed back into a form page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub role: Option<i32>,
}

impl From<&User> for FormUser {
    fn from(user: &User) -> Self {
        Self {
            id: Some(user.id),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            role: Some(user.role),
        }
    }
}

fn trim(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn collect_messages(errors: &ValidationErrors, fields: &[&str]) -> Vec<FormError> {
    let by_field = errors.field_errors();
    fields
        .iter()
        .filter_map(|field| by_field.get(*field))
        .flat_map(|errs| errs.iter())
        .map(|e| {
            FormError::new(
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
            )
        })
        .collect()
}

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_username_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(failure("alphanumeric", "Username has non-alphanumeric characters."))
    }
}

fn validate_password_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(failure("alphanumeric", "Password has non-alphanumeric characters."))
    }
}

fn validate_alphanumeric_with_spaces(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        Ok(())
    } else {
        Err(failure("alphanumeric", "Full name has non-alphanumeric characters."))
    }
}

fn validate_role(value: &str) -> Result<(), ValidationError> {
    match value.parse::<i32>().map(Role::try_from) {
        Ok(Ok(_)) => Ok(()),
        _ => Err(failure("role", "A role must be selected for the user.")),
    }
}
