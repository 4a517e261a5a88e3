//! Library catalog server
//!
//! Session-based accounts and role-gated catalog routes, served as a JSON
//! web application.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
