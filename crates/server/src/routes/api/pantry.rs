//! Pantry endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use bocado_core::{
    CategoryFilter, KitchenItem, KitchenItemId, KitchenItemPatch, NewKitchenItem, Zone,
    ZoneSummary,
};

use crate::db::PantryRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::pantry::PantryService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub zone: String,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneQuery {
    pub zone: String,
}

fn service(state: &AppState) -> PantryService<'_, PantryRepository<'_>> {
    PantryService::new(state.pantry_sessions(), PantryRepository::new(state.pool()))
}

/// GET /api/pantry/zones
///
/// # Errors
///
/// Returns `AppError::Database` if the pantry cannot be loaded.
pub async fn zones(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ZoneSummary>>> {
    Ok(Json(service(&state).zones(user.id).await?))
}

/// GET /api/pantry/items?zone=&category=
///
/// # Errors
///
/// Returns `AppError::Pantry` for an unknown zone.
pub async fn items(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<KitchenItem>>> {
    let zone: Zone = query.zone.parse()?;
    let filter = CategoryFilter::from(query.category.as_deref());
    Ok(Json(service(&state).items(user.id, zone, &filter).await?))
}

/// GET /api/pantry/categories?zone=
///
/// # Errors
///
/// Returns `AppError::Pantry` for an unknown zone.
pub async fn categories(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ZoneQuery>,
) -> Result<Json<Vec<String>>> {
    let zone: Zone = query.zone.parse()?;
    Ok(Json(service(&state).categories(user.id, zone).await?))
}

/// POST /api/pantry/items
///
/// # Errors
///
/// Returns `AppError::Pantry` for an invalid item.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(new_item): Json<NewKitchenItem>,
) -> Result<(StatusCode, Json<KitchenItem>)> {
    let item = service(&state).add(user.id, new_item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /api/pantry/items/{id}
///
/// # Errors
///
/// Returns `AppError::Pantry` for an unknown item or empty patch.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<KitchenItemId>,
    Json(patch): Json<KitchenItemPatch>,
) -> Result<Json<KitchenItem>> {
    Ok(Json(service(&state).update(user.id, id, &patch).await?))
}

/// DELETE /api/pantry/items/{id}
///
/// # Errors
///
/// Returns `AppError::Pantry` for an unknown item.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<KitchenItemId>,
) -> Result<StatusCode> {
    service(&state).remove(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
