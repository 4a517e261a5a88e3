//! Router-level tests of the catalog gate, run against in-memory storage

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use library_catalog::{
    api,
    auth::password::set_password,
    config::AppConfig,
    models::user::UserRecord,
    repository::Repository,
    services::{sessions::MemorySessionStore, Services},
    AppState,
};

fn app_sharing(repository: Repository, sessions: Arc<MemorySessionStore>) -> Router {
    let config = AppConfig::default();
    let services = Services::new(repository, sessions, &config.session);
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn app_with(repository: Repository) -> Router {
    app_sharing(repository, Arc::new(MemorySessionStore::new()))
}

fn app() -> Router {
    app_with(Repository::in_memory())
}

fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("library.sid="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn get(app: &Router, path: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, path: &str, body: &str) -> axum::response::Response {
    post_form_with(app, path, body, None).await
}

async fn post_form_with(
    app: &Router,
    path: &str,
    body: &str,
    cookie: Option<&str>,
) -> axum::response::Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, role: i32) {
    let registration = format!(
        "username={u}&fullname=Test+User&email={u}%40example.org&role={r}&password=secret1&password_confirm=secret1",
        u = username,
        r = role
    );
    let response = post_form(app, "/users/register", &registration).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");
}

/// Log in and return the session cookie
async fn login(app: &Router, username: &str, password: &str) -> String {
    let credentials = format!("username={}&password={}", username, password);
    let response = post_form(app, "/users/login", &credentials).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response).expect("login sets a session cookie")
}

/// Register `username` with `role` and return the cookie of a logged-in session
async fn login_as(app: &Router, username: &str, role: i32) -> String {
    register(app, username, role).await;
    login(app, username, "secret1").await
}

#[tokio::test]
async fn test_anonymous_create_redirects_to_login() {
    let app = app();

    let response = get(&app, "/catalog/book/create", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");

    let cookie = session_cookie(&response).expect("notice is kept in a session");
    let page = json_body(get(&app, "/users/login", Some(&cookie)).await).await;
    assert_eq!(page["errors"][0]["msg"], "You need to login first!");

    // The notice is shown once
    let page = json_body(get(&app, "/users/login", Some(&cookie)).await).await;
    assert!(page.get("errors").is_none());
}

#[tokio::test]
async fn test_anonymous_read_redirects_to_login() {
    let app = app();

    let response = get(&app, "/catalog/genre/5f3a", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_reader_cannot_create() {
    let app = app();
    let cookie = login_as(&app, "reader", 0).await;

    let response = get(&app, "/catalog/book/create", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/stop");

    let page = json_body(get(&app, "/users/stop", Some(&cookie)).await).await;
    assert_eq!(page["title"], "Sorry!");
    assert_eq!(page["errors"][0]["msg"], "You're not authorized to access this page!");
}

#[tokio::test]
async fn test_reader_can_read() {
    let app = app();
    let cookie = login_as(&app, "reader", 0).await;

    let response = get(&app, "/catalog/bookinstance/abc123", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = json_body(response).await;
    assert_eq!(page["entity"], "bookinstance");
    assert_eq!(page["id"], "abc123");
    assert_eq!(page["operation"], "read");
}

#[tokio::test]
async fn test_editor_can_update_but_not_delete() {
    let app = app();
    let cookie = login_as(&app, "editor", 1).await;

    let response = get(&app, "/catalog/author/42/update", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["operation"], "update");

    let response = get(&app, "/catalog/author/42/delete", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/stop");
}

#[tokio::test]
async fn test_admin_can_delete() {
    let app = app();
    let cookie = login_as(&app, "admin", 2).await;

    let response = get(&app, "/catalog/genre/7/delete", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = json_body(response).await;
    assert_eq!(page["entity"], "genre");
    assert_eq!(page["operation"], "delete");
    assert_eq!(page["current_user"]["username"], "admin");
}

#[tokio::test]
async fn test_unknown_role_is_denied() {
    let repository = Repository::in_memory();
    repository
        .users
        .create(&UserRecord {
            username: "ghost".to_string(),
            fullname: "Ghost User".to_string(),
            email: "ghost@example.org".to_string(),
            role: 7,
            password: set_password("secret1"),
        })
        .await
        .unwrap();
    let app = app_with(repository);

    let response = post_form(&app, "/users/login", "username=ghost&password=secret1").await;
    let cookie = session_cookie(&response).unwrap();

    let response = get(&app, "/catalog/book/abc123", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/stop");
}

#[tokio::test]
async fn test_ungated_paths() {
    let app = app();

    let response = get(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");

    let response = get(&app, "/catalog", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["is_authenticated"], false);
    assert_eq!(page["entities"].as_array().map(Vec::len), Some(4));

    // Not a catalog entity: no rule matches, the route itself rejects it
    let response = get(&app, "/catalog/magazine/create", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_ends_access() {
    let app = app();
    let cookie = login_as(&app, "admin", 2).await;

    let response = get(&app, "/users/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = get(&app, "/catalog/book/abc123", Some(&cookie)).await;
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_failed_login_flashes_message() {
    let app = app();
    login_as(&app, "reader", 0).await;

    let response = post_form(&app, "/users/login", "username=reader&password=wrong1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");

    let cookie = session_cookie(&response).unwrap();
    let page = json_body(get(&app, "/users/login", Some(&cookie)).await).await;
    assert_eq!(page["errors"][0]["msg"], "Incorrect password.");
}

#[tokio::test]
async fn test_registration_errors_are_reported() {
    let app = app();

    let response = post_form(
        &app,
        "/users/register",
        "username=ab&fullname=Test+User&email=nobody&role=0&password=secret1&password_confirm=secret2",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let page = json_body(response).await;
    let messages: Vec<&str> = page["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["msg"].as_str())
        .collect();
    assert!(messages.contains(&"Username must be at least 3 characters long."));
    assert!(messages.contains(&"Please enter a valid email address."));
    assert!(messages.contains(&"Passwords do not match."));
    assert_eq!(page["user"]["username"], "ab");
}

#[tokio::test]
async fn test_unclassifiable_ids_are_not_found() {
    let app = app();
    let cookie = login_as(&app, "reader", 0).await;

    for path in [
        "/catalog/book/_x",
        "/catalog/book/-1",
        "/catalog/book/-1/delete",
        "/catalog/book/_x/delete",
    ] {
        let response = get(&app, path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "anonymous {}", path);

        let response = get(&app, path, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "reader {}", path);
    }

    // Only the detail rule matches (id `a`): gated as a read, and the update
    // route does not serve it
    let response = get(&app, "/catalog/genre/a-b/update", None).await;
    assert_eq!(location(&response), "/users/login");
    let response = get(&app, "/catalog/genre/a-b/update", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_percent_encoded_paths_are_gated() {
    let app = app();

    for path in ["/catalog/%62ook/42", "/catalog/book/%34%32/delete"] {
        let response = get(&app, path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), "/users/login", "{}", path);
    }

    let reader = login_as(&app, "reader", 0).await;
    let response = get(&app, "/catalog/book/%34%32/delete", Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/stop");

    let admin = login_as(&app, "admin", 2).await;
    let response = get(&app, "/catalog/%62ook/42", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["entity"], "book");
    assert_eq!(page["id"], "42");
    assert_eq!(page["operation"], "read");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = app();
    register(&app, "reader", 0).await;

    let response = post_form(&app, "/users/reset", "username=reader&email=reader%40example.org").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["is_second_step"], true);
    assert_eq!(page["user"]["username"], "reader");
    let user_id = page["user"]["id"].as_i64().unwrap();

    let body = format!(
        "userid={}&password=changed1&password_confirm=changed1",
        user_id
    );
    let response = post_form(&app, "/users/resetfinal", &body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login");

    let cookie = session_cookie(&response).unwrap();
    let page = json_body(get(&app, "/users/login", Some(&cookie)).await).await;
    assert_eq!(
        page["errors"][0]["msg"],
        "You have successfully changed your password. You can log in now!"
    );

    let response = post_form(&app, "/users/login", "username=reader&password=secret1").await;
    assert_eq!(location(&response), "/users/login");

    let cookie = login(&app, "reader", "changed1").await;
    let response = get(&app, "/catalog/book/42", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_rejections() {
    let app = app();
    register(&app, "reader", 0).await;

    let response = post_form(&app, "/users/reset", "username=reader&email=other%40example.org").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = json_body(response).await;
    assert_eq!(page["is_first_step"], true);
    assert_eq!(
        page["errors"][0]["msg"],
        "The user does not exist or credentials did not match a user. Try again."
    );

    for userid in ["999", "abc"] {
        let body = format!("userid={}&password=changed1&password_confirm=changed1", userid);
        let response = post_form(&app, "/users/resetfinal", &body).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "userid {}", userid);
    }

    let response = post_form(
        &app,
        "/users/resetfinal",
        "userid=1&password=changed1&password_confirm=changed2",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = json_body(response).await;
    assert_eq!(page["is_second_step"], true);
    assert_eq!(page["errors"][0]["msg"], "Passwords do not match.");
}

#[tokio::test]
async fn test_profile_pages_are_owner_only() {
    let app = app();
    let owner = login_as(&app, "owner", 0).await;
    let other = login_as(&app, "other", 0).await;

    let response = get(&app, "/users/1", Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["user"]["username"], "owner");
    assert!(page["user"].get("salt").is_none());

    let response = get(&app, "/users/1/update", Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["is_update_form"], true);

    for path in ["/users/1", "/users/1/update"] {
        let response = get(&app, path, Some(&other)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "other {}", path);
        assert_eq!(location(&response), "/", "other {}", path);

        let response = get(&app, path, None).await;
        assert_eq!(location(&response), "/", "anonymous {}", path);
    }
}

#[tokio::test]
async fn test_profile_update() {
    let app = app();
    let owner = login_as(&app, "owner", 0).await;
    let other = login_as(&app, "other", 0).await;

    let form = "username=owner&fullname=New+Name&email=new%40example.org&role=0&password=renewed1&password_confirm=renewed1";

    // Someone else's profile stays untouched
    let response = post_form_with(&app, "/users/1/update", form, Some(&other)).await;
    assert_eq!(location(&response), "/");
    let page = json_body(get(&app, "/users/1", Some(&owner)).await).await;
    assert_eq!(page["user"]["fullname"], "Test User");

    let response = post_form_with(&app, "/users/1/update", form, Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/1");

    let page = json_body(get(&app, "/users/1", Some(&owner)).await).await;
    assert_eq!(page["user"]["fullname"], "New Name");
    assert_eq!(page["user"]["email"], "new@example.org");

    login(&app, "owner", "renewed1").await;

    // Taking another user's name is refused
    let taken = "username=other&fullname=New+Name&email=new%40example.org&role=0&password=renewed1&password_confirm=renewed1";
    let response = post_form_with(&app, "/users/1/update", taken, Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["errors"][0]["msg"],
        "Username already taken. Choose another one."
    );
}

#[tokio::test]
async fn test_session_of_vanished_user_is_logged_out() {
    let sessions = Arc::new(MemorySessionStore::new());
    let app = app_sharing(Repository::in_memory(), sessions.clone());
    let cookie = login_as(&app, "reader", 0).await;

    // Same session store, but the user record is gone
    let emptied = app_sharing(Repository::in_memory(), sessions);

    let response = get(&emptied, "/users/login", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["is_authenticated"], false);

    let response = get(&emptied, "/catalog/book/42", Some(&cookie)).await;
    assert_eq!(location(&response), "/users/login");

    // The session itself no longer names a user
    let response = get(&app, "/catalog/book/42", Some(&cookie)).await;
    assert_eq!(location(&response), "/users/login");
}

#[tokio::test]
async fn test_logged_in_users_skip_account_forms() {
    let app = app();
    let cookie = login_as(&app, "reader", 0).await;

    for path in ["/users/login", "/users/register", "/users/reset"] {
        let response = get(&app, path, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), "/", "{}", path);

        let response = get(&app, path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "anonymous {}", path);
    }
}
