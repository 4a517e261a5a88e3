//! Cookie-backed session layer
//!
//! [`session_layer`] loads the session named by the request cookie,
//! resolves its user once, and exposes both to handlers through request
//! extensions ([`Session`] and [`CurrentUser`]). After the handler ran, a
//! modified session is written back and the cookie set or cleared.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
    models::user::{FormError, SessionUser},
    services::sessions::{FlashKind, SessionData, SessionService},
    AppState,
};

struct SessionState {
    id: Option<String>,
    data: SessionData,
    modified: bool,
    destroyed: bool,
    regenerate: bool,
}

/// Handle on the current request's session
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    fn new(id: Option<String>, data: SessionData, modified: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                id,
                data,
                modified,
                destroyed: false,
                regenerate: false,
            })),
        }
    }

    pub async fn user_id(&self) -> Option<i32> {
        self.inner.lock().await.data.user_id
    }

    /// Bind the session to `user_id` under a fresh session id
    pub async fn login(&self, user_id: i32) {
        let mut state = self.inner.lock().await;
        state.data.user_id = Some(user_id);
        state.regenerate = true;
        state.modified = true;
    }

    /// Drop the session entirely
    pub async fn logout(&self) {
        let mut state = self.inner.lock().await;
        state.data = SessionData::default();
        state.destroyed = true;
    }

    pub async fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        let mut state = self.inner.lock().await;
        state.data.flash.push(kind, message);
        state.modified = true;
    }

    /// Consume pending flash messages: the first error and the first success
    pub async fn take_messages(&self) -> Vec<FormError> {
        let mut state = self.inner.lock().await;
        if state.data.flash.is_empty() {
            return Vec::new();
        }

        let flash = std::mem::take(&mut state.data.flash);
        state.modified = true;

        flash
            .error
            .into_iter()
            .next()
            .into_iter()
            .chain(flash.success.into_iter().next())
            .map(FormError::new)
            .collect()
    }

    /// Persist changes and compute the cookie delta
    async fn commit(
        &self,
        sessions: &SessionService,
        config: &SessionConfig,
        jar: CookieJar,
    ) -> AppResult<CookieJar> {
        let mut state = self.inner.lock().await;

        if state.destroyed {
            if let Some(id) = state.id.take() {
                sessions.destroy(&id).await?;
            }
            return Ok(jar.remove(Cookie::build((config.cookie_name.clone(), "")).path("/")));
        }

        if state.regenerate {
            if let Some(old) = state.id.take() {
                sessions.destroy(&old).await?;
            }
        }

        // Sessions are only created once something is stored in them
        if !state.modified || (state.id.is_none() && state.data.is_empty()) {
            return Ok(jar);
        }

        let (id, is_new) = match &state.id {
            Some(id) => (id.clone(), false),
            None => (SessionService::new_id(), true),
        };
        sessions.save(&id, &state.data).await?;
        state.id = Some(id.clone());

        if !is_new {
            return Ok(jar);
        }

        let cookie = Cookie::build((config.cookie_name.clone(), id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(config.secure);
        Ok(jar.add(cookie))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer not installed".to_string()))
    }
}

/// The authenticated user of the request, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<SessionUser>);

impl CurrentUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Middleware loading and saving the session around every request
pub async fn session_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match run_session(state, req, next).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn run_session(state: AppState, mut req: Request, next: Next) -> AppResult<Response> {
    let config = &state.config.session;
    let sessions = &state.services.sessions;
    let jar = CookieJar::from_headers(req.headers());

    let loaded = match jar.get(&config.cookie_name) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            sessions.load(&id).await?.map(|data| (id, data))
        }
        None => None,
    };
    let (id, mut data) = match loaded {
        Some((id, data)) => (Some(id), data),
        None => (None, SessionData::default()),
    };

    // Resolve the session's user; a vanished user logs the session out
    let mut stale = false;
    let identity = match data.user_id {
        Some(user_id) => match state.services.users.get_by_id(user_id).await? {
            Some(user) => Some(SessionUser::from(&user)),
            None => {
                tracing::warn!(user_id, "Session references unknown user");
                data.user_id = None;
                stale = true;
                None
            }
        },
        None => None,
    };

    let session = Session::new(id, data, stale);
    req.extensions_mut().insert(session.clone());
    req.extensions_mut().insert(CurrentUser(identity));

    let response = next.run(req).await;

    let jar = session.commit(sessions, config, jar).await?;
    Ok((jar, response).into_response())
}
