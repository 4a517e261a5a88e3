//! Account routes: login, registration, password reset and profile

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::{
    auth::gate::LOGIN_PATH,
    error::{AppError, AppResult},
    models::user::{FormError, FormUser, LoginForm, ResetFinalForm, ResetRequestForm, UserForm},
    services::sessions::FlashKind,
    AppState,
};

use super::{
    pages::Page,
    session::{CurrentUser, Session},
};

const REGISTERED_NOTICE: &str = "Successfully registered. You can log in now!";
const PASSWORD_CHANGED_NOTICE: &str = "You have successfully changed your password. You can log in now!";
const RESET_NO_MATCH: &str = "The user does not exist or credentials did not match a user. Try again.";

/// `/users` has no page of its own
pub async fn users_root() -> Redirect {
    Redirect::to("/")
}

/// Login page with any pending messages
pub async fn login_page(current: CurrentUser, session: Session) -> Response {
    if current.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    let messages = session.take_messages().await;
    Page::new("Login", &current).with_errors(messages).into_response()
}

/// Check credentials and start an authenticated session
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Redirect> {
    match state.services.users.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            session.login(user.id).await;
            tracing::info!(user_id = user.id, "User {} logged in", user.username);
            Ok(Redirect::to("/"))
        }
        Err(AppError::Authentication(message)) => {
            session.flash(FlashKind::Error, message).await;
            Ok(Redirect::to(LOGIN_PATH))
        }
        Err(e) => Err(e),
    }
}

pub async fn logout(session: Session) -> Redirect {
    session.logout().await;
    Redirect::to("/")
}

pub async fn register_page(current: CurrentUser) -> Response {
    if current.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    Page::new("Create User", &current).into_response()
}

/// Create an account from the registration form
pub async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    session: Session,
    Form(form): Form<UserForm>,
) -> AppResult<Response> {
    let form = form.sanitize();
    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(form_page("Create User", &current, form.echo(), errors, false));
    }

    match state.services.users.register(&form).await {
        Ok(_) => {
            session.flash(FlashKind::Success, REGISTERED_NOTICE).await;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(AppError::Conflict(message)) => Ok(form_page(
            "Create User",
            &current,
            form.echo(),
            vec![FormError::new(message)],
            false,
        )),
        Err(e) => Err(e),
    }
}

pub async fn reset_page(current: CurrentUser) -> Response {
    if current.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    let mut page = Page::new("Reset Password", &current);
    page.is_first_step = true;
    page.into_response()
}

/// First reset step: identify the account by username and email
pub async fn reset_request(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<ResetRequestForm>,
) -> AppResult<Response> {
    let form = form.sanitize();
    let echo = FormUser {
        username: form.username.clone(),
        email: form.email.clone(),
        ..Default::default()
    };

    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(reset_step_one(&current, echo, errors));
    }

    let Some(user) = state
        .services
        .users
        .find_for_reset(&form.username, &form.email)
        .await?
    else {
        return Ok(reset_step_one(&current, echo, vec![FormError::new(RESET_NO_MATCH)]));
    };

    let mut page = Page::new("Reset Password", &current).with_user(FormUser::from(&user));
    page.is_second_step = true;
    Ok(page.into_response())
}

/// Final reset step: store the new password
pub async fn reset_final(
    State(state): State<AppState>,
    current: CurrentUser,
    session: Session,
    Form(form): Form<ResetFinalForm>,
) -> AppResult<Response> {
    let form = form.sanitize();

    let errors = form.errors();
    if !errors.is_empty() {
        let echo = FormUser {
            id: form.userid.parse().ok(),
            ..Default::default()
        };
        let mut page = Page::new("Reset Password", &current)
            .with_user(echo)
            .with_errors(errors);
        page.is_second_step = true;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let user_id: i32 = form
        .userid
        .parse()
        .map_err(|_| AppError::NotFound("User not found".to_string()))?;
    state.services.users.reset_password(user_id, &form.password).await?;

    session.flash(FlashKind::Success, PASSWORD_CHANGED_NOTICE).await;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

/// Target of denied catalog requests
pub async fn warning(current: CurrentUser, session: Session) -> Page {
    let messages = session.take_messages().await;
    Page::new("Sorry!", &current).with_errors(messages)
}

pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(user_id) = owned_page(&current, &id) else {
        return Ok(Redirect::to("/").into_response());
    };

    let user = state
        .services
        .users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Page::new("User Profile", &current)
        .with_user(FormUser::from(&user))
        .into_response())
}

pub async fn update_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(user_id) = owned_page(&current, &id) else {
        return Ok(Redirect::to("/").into_response());
    };

    let user = state
        .services
        .users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut page = Page::new("Update User", &current).with_user(FormUser::from(&user));
    page.is_update_form = true;
    Ok(page.into_response())
}

/// Rewrite the owner's profile and password
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<UserForm>,
) -> AppResult<Response> {
    let Some(user_id) = owned_page(&current, &id) else {
        return Ok(Redirect::to("/").into_response());
    };

    let form = form.sanitize();
    let mut echo = form.echo();
    echo.id = Some(user_id);

    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(form_page("Update User", &current, echo, errors, true));
    }

    match state.services.users.update_profile(user_id, &form).await {
        Ok(user) => Ok(Redirect::to(&user.url()).into_response()),
        Err(AppError::Conflict(message)) => Ok(form_page(
            "Update User",
            &current,
            echo,
            vec![FormError::new(message)],
            true,
        )),
        Err(e) => Err(e),
    }
}

/// The page id when it belongs to the logged-in user
fn owned_page(current: &CurrentUser, id: &str) -> Option<i32> {
    current
        .0
        .as_ref()
        .filter(|user| user.id.to_string() == id)
        .map(|user| user.id)
}

fn form_page(
    title: &'static str,
    current: &CurrentUser,
    user: FormUser,
    errors: Vec<FormError>,
    is_update_form: bool,
) -> Response {
    let mut page = Page::new(title, current).with_user(user).with_errors(errors);
    page.is_update_form = is_update_form;
    (StatusCode::BAD_REQUEST, page).into_response()
}

fn reset_step_one(current: &CurrentUser, user: FormUser, errors: Vec<FormError>) -> Response {
    let mut page = Page::new("Reset Password", current)
        .with_user(user)
        .with_errors(errors);
    page.is_first_step = true;
    (StatusCode::BAD_REQUEST, page).into_response()
}
