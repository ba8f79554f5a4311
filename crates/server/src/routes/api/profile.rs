//! Profile endpoints.
//!
//! Whatever the client sends is run through the sanitizer before it is
//! stored, and a user without a stored profile reads the defaults.

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use bocado_core::profile::normalize_language;
use bocado_core::{DEFAULT_LANGUAGE, UserProfile, sanitize_profile_data};

use crate::db::ProfileRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub language: String,
}

/// GET /api/profile
///
/// # Errors
///
/// Returns `AppError::Database` if the profile cannot be read.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let stored = ProfileRepository::new(state.pool()).get(user.id).await?;

    Ok(Json(stored.map_or_else(
        || ProfileResponse {
            profile: UserProfile::default(),
            language: DEFAULT_LANGUAGE.to_owned(),
        },
        |stored| ProfileResponse {
            profile: stored.profile,
            language: stored.language,
        },
    )))
}

/// PUT /api/profile
///
/// Accepts any JSON document. A `language` field switches the stored
/// language; without one the current language is kept.
///
/// # Errors
///
/// Returns `AppError::Database` if the profile cannot be stored.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(document): Json<Value>,
) -> Result<Json<ProfileResponse>> {
    let profiles = ProfileRepository::new(state.pool());
    let profile = sanitize_profile_data(Some(&document));

    let language = match document.get("language").and_then(Value::as_str) {
        Some(requested) => normalize_language(Some(requested)),
        None => profiles
            .get(user.id)
            .await?
            .map_or_else(|| DEFAULT_LANGUAGE.to_owned(), |stored| stored.language),
    };

    profiles.upsert(user.id, &profile, &language).await?;
    info!(user_id = %user.id, "Profile updated");

    Ok(Json(ProfileResponse { profile, language }))
}
