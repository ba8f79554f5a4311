//! Saved recipes and restaurants.
//!
//! Saving is idempotent: the same title saved twice lands on the same id.
//! Restaurant saves follow the `savedRestaurants` flag.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use bocado_core::{FeatureFlag, SavedItem, SavedItemId, SavedKind};

use crate::db::{FlagRepository, SavedItemRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::flags::FlagResolver;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SavedQuery {
    #[serde(rename = "type")]
    pub kind: Option<SavedKind>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(rename = "type")]
    pub kind: SavedKind,
    pub title: String,
    /// The recommendation payload, kept as-is.
    #[serde(default)]
    pub data: Value,
}

/// GET /api/saved[?type=recipe|restaurant]
///
/// # Errors
///
/// Returns `AppError::Database` if the items cannot be read.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<SavedQuery>,
) -> Result<Json<Vec<SavedItem>>> {
    let items = SavedItemRepository::new(state.pool())
        .list(user.id, query.kind)
        .await?;
    Ok(Json(items))
}

/// POST /api/saved
///
/// # Errors
///
/// Returns `AppError::Saved` for a title without letters or digits and
/// `AppError::Forbidden` for restaurants while `savedRestaurants` is off.
pub async fn save(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SavedItem>> {
    if req.kind == SavedKind::Restaurant {
        // Read the store directly so a flag flip applies to the next save.
        let enabled = FlagResolver::new(FlagRepository::new(state.pool()))
            .is_enabled(FeatureFlag::SavedRestaurants, Some(user.id))
            .await;
        if !enabled {
            return Err(AppError::Forbidden(
                "saving restaurants is not available".to_owned(),
            ));
        }
    }

    let item = SavedItem::new(user.id, req.kind, &req.title, req.data, Utc::now())?;
    let saved = SavedItemRepository::new(state.pool()).upsert(&item).await?;
    info!(user_id = %user.id, saved_id = %saved.id, kind = %saved.kind, "Item saved");

    Ok(Json(saved))
}

/// DELETE /api/saved/{id}
///
/// # Errors
///
/// Returns `AppError::Database` with `NotFound` if the user owns no such item.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    SavedItemRepository::new(state.pool())
        .delete(user.id, &SavedItemId::from_raw(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
