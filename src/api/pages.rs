//! Page documents returned by the user-facing routes

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::user::{FormError, FormUser, SessionUser};

use super::session::CurrentUser;

/// A rendered page: title, messages and page-specific fields
#[derive(Debug, Default, Serialize)]
pub struct Page {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FormError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<FormUser>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_update_form: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_first_step: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_second_step: bool,
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<SessionUser>,
}

impl Page {
    pub fn new(title: &'static str, current: &CurrentUser) -> Self {
        Self {
            title,
            is_authenticated: current.is_authenticated(),
            current_user: current.0.clone(),
            ..Default::default()
        }
    }

    /// Attach messages; an empty list leaves the page without errors
    pub fn with_errors(mut self, errors: Vec<FormError>) -> Self {
        self.errors = if errors.is_empty() { None } else { Some(errors) };
        self
    }

    pub fn with_user(mut self, user: FormUser) -> Self {
        self.user = Some(user);
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
