//! HTTP routes and request plumbing

pub mod catalog;
pub mod health;
pub mod pages;
pub mod session;
pub mod users;

use axum::{
    middleware,
    response::Redirect,
    routing::{any, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth, AppState};

pub use session::{CurrentUser, Session};

/// Create the application router with all routes.
///
/// Layer order, outermost first: tracing, session, catalog guard.
pub fn create_router(state: AppState) -> Router {
    let users = Router::new()
        .route("/", any(users::users_root))
        .route("/login", get(users::login_page).post(users::login))
        .route("/logout", get(users::logout))
        .route("/register", get(users::register_page).post(users::register))
        .route("/reset", get(users::reset_page).post(users::reset_request))
        .route("/resetfinal", post(users::reset_final))
        .route("/stop", get(users::warning))
        .route("/:id", get(users::profile))
        .route("/:id/update", get(users::update_page).post(users::update));

    let catalog = Router::new()
        .route("/", get(catalog::index))
        .route("/:entity/create", get(catalog::create).post(catalog::create))
        .route("/:entity/:id", get(catalog::detail))
        .route("/:entity/:id/update", get(catalog::update).post(catalog::update))
        .route("/:entity/:id/delete", get(catalog::delete).post(catalog::delete));

    Router::new()
        .route("/", get(|| async { Redirect::to("/catalog") }))
        .route("/health", get(health::health_check))
        .nest("/users", users)
        .nest("/catalog", catalog)
        .layer(middleware::from_fn(auth::middleware::catalog_guard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
