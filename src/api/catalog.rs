//! Catalog routes
//!
//! Entity pages are placeholders: they report which entity, id and
//! operation the gate let through. Catalog editing is handled elsewhere.

use axum::{
    extract::Path,
    Extension, Json,
};
use serde::Serialize;

use crate::{
    auth::{Classification, EntityKind, Operation},
    error::{AppError, AppResult},
    models::user::SessionUser,
};

use super::session::CurrentUser;

#[derive(Debug, Serialize)]
pub struct CatalogIndex {
    pub title: &'static str,
    pub entities: Vec<EntityLink>,
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<SessionUser>,
}

#[derive(Debug, Serialize)]
pub struct EntityLink {
    pub kind: EntityKind,
    pub create_url: String,
}

/// What a gated catalog handler was reached with
#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub title: String,
    pub entity: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub operation: Operation,
    pub current_user: Option<SessionUser>,
}

/// Catalog home
pub async fn index(current: CurrentUser) -> Json<CatalogIndex> {
    Json(CatalogIndex {
        title: "Local Library Home",
        entities: EntityKind::ALL
            .iter()
            .map(|kind| EntityLink {
                kind: *kind,
                create_url: format!("/catalog/{}/create", kind),
            })
            .collect(),
        is_authenticated: current.is_authenticated(),
        current_user: current.0,
    })
}

pub async fn create(
    current: CurrentUser,
    classification: Option<Extension<Classification>>,
    Path(entity): Path<String>,
) -> AppResult<Json<CatalogPage>> {
    page(current, classification, &entity, None, Operation::Create)
}

pub async fn detail(
    current: CurrentUser,
    classification: Option<Extension<Classification>>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<Json<CatalogPage>> {
    page(current, classification, &entity, Some(id), Operation::Read)
}

pub async fn update(
    current: CurrentUser,
    classification: Option<Extension<Classification>>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<Json<CatalogPage>> {
    page(current, classification, &entity, Some(id), Operation::Update)
}

pub async fn delete(
    current: CurrentUser,
    classification: Option<Extension<Classification>>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<Json<CatalogPage>> {
    page(current, classification, &entity, Some(id), Operation::Delete)
}

fn page(
    current: CurrentUser,
    classification: Option<Extension<Classification>>,
    entity: &str,
    id: Option<String>,
    route_operation: Operation,
) -> AppResult<Json<CatalogPage>> {
    let entity: EntityKind = entity
        .parse()
        .map_err(|_| AppError::NotFound(format!("No catalog entity '{}'", entity)))?;

    // The guard classifies every path naming a catalog record. A route
    // reached unclassified (ids such as `_x` or `-1`), or classified as
    // something other than this route (`/genre/a-b/update` only matches the
    // detail rule), names no record.
    let classification = match classification {
        Some(Extension(c)) if c.entity == entity && c.operation == route_operation => c,
        other => {
            tracing::debug!(
                %entity,
                operation = %route_operation,
                ?id,
                classified = ?other.map(|Extension(c)| c),
                "Catalog path does not name a record"
            );
            return Err(AppError::NotFound(format!("No {} record at this path", entity)));
        }
    };

    Ok(Json(CatalogPage {
        title: format!("{} {}", entity, classification.operation),
        entity,
        id,
        operation: classification.operation,
        current_user: current.0,
    }))
}
