//! Feature flag endpoints.
//!
//! Anonymous visitors get the Global layer over the defaults; signed-in
//! users get their own layer on top.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use bocado_core::{FeatureFlag, FeatureFlags};

use crate::db::FlagRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::services::flags::FlagResolver;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FlagsQuery {
    /// Bypass the cache and report whether anything changed.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct FlagsResponse {
    pub flags: FeatureFlags,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub name: FeatureFlag,
    pub enabled: bool,
}

/// GET /api/flags[?refresh=true]
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<FlagsQuery>,
) -> Json<FlagsResponse> {
    let user = user.map(|u| u.id);
    let resolver = FlagResolver::new(FlagRepository::new(state.pool()));

    let response = if query.refresh {
        let refresh = state.flag_cache().refresh(&resolver, user).await;
        FlagsResponse {
            flags: refresh.flags,
            changed: refresh.changed,
        }
    } else {
        FlagsResponse {
            flags: state.flag_cache().get(&resolver, user).await,
            changed: false,
        }
    };

    Json(response)
}

/// GET /api/flags/{name}
///
/// # Errors
///
/// Returns `AppError::NotFound` for a name that is not a known flag.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(name): Path<String>,
) -> Result<Json<FlagResponse>> {
    let flag: FeatureFlag = name
        .parse()
        .map_err(|_| AppError::NotFound(format!("flag '{name}'")))?;

    let resolver = FlagResolver::new(FlagRepository::new(state.pool()));
    let flags = state.flag_cache().get(&resolver, user.map(|u| u.id)).await;

    Ok(Json(FlagResponse {
        name: flag,
        enabled: flags.get(flag),
    }))
}
