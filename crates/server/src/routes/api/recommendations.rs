//! Recommendation request endpoint.
//!
//! Generation happens in an external service; this endpoint validates and
//! acknowledges the request.

use axum::{Json, extract::State};
use tracing::info;
use uuid::Uuid;

use bocado_core::{RecommendationRequest, RecommendationResponse};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// POST /api/recommendations
///
/// # Errors
///
/// Returns `AppError::Forbidden` if `userId` is not the signed-in user.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    if req.user_id != user.id {
        return Err(AppError::Forbidden(
            "userId does not match the signed-in user".to_owned(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    info!(
        user_id = %user.id,
        request_id = %id,
        kind = ?req.kind,
        meal_type = %req.meal_type,
        cooking_time = %req.cooking_time,
        cravings = req.cravings.len(),
        environment = %state.config().environment,
        "Recommendation requested"
    );

    Ok(Json(RecommendationResponse { id }))
}
