//! Catalog gate middleware
//!
//! Runs inside the session layer. The percent-decoded path is classified,
//! matching what the router's path extractors see. Paths no classification
//! rule matches pass straight through; everything else goes through
//! [`gate::evaluate`].

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    api::session::{CurrentUser, Session},
    services::sessions::FlashKind,
};

use super::{classifier, gate, Decision};

/// Classify the request and allow or redirect it
pub async fn catalog_guard(mut req: Request, next: Next) -> Response {
    let path = decoded_path(req.uri().path());
    let matches = classifier::classify_all(&path);
    if matches.is_empty() {
        return next.run(req).await;
    }

    let identity = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    match gate::evaluate(identity.as_ref(), &matches) {
        Decision::Allow => {
            if let Some(Ok(classification)) = matches.first() {
                req.extensions_mut().insert(*classification);
            }
            next.run(req).await
        }
        Decision::Deny(denial) => {
            tracing::info!(
                path = %path,
                operation = ?matches.first().and_then(|m| m.as_ref().ok()).map(|c| c.operation),
                role = ?identity.as_ref().map(|u| u.role),
                role_name = ?identity.as_ref().and_then(|u| u.role_name()),
                "Catalog access denied: {:?}",
                denial
            );

            let session = req.extensions().get::<Session>().cloned();
            if let Some(session) = session {
                session.flash(FlashKind::Error, denial.notice()).await;
            }
            Redirect::to(denial.redirect_to()).into_response()
        }
    }
}

/// Request path with percent-escapes resolved; invalid UTF-8 is replaced
fn decoded_path(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}
