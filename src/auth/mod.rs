//! Authentication and authorization for catalog routes
//!
//! Every request under `/catalog` is classified into an (entity, operation)
//! pair by [`classifier`], then run through the guards in [`gate`] against
//! the session identity. [`middleware::catalog_guard`] wires both into the
//! router.

pub mod classifier;
pub mod gate;
pub mod middleware;
pub mod password;
pub mod roles;

pub use classifier::{Classification, EntityKind, Operation};
pub use gate::{Decision, Denial};
pub use roles::Role;
