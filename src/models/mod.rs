//! Data models for the catalog server

pub mod user;

// Re-export commonly used types
pub use user::{SessionUser, User};
