//! JSON API consumed by the Bocado client.

pub mod flags;
pub mod pantry;
pub mod profile;
pub mod recommendations;
pub mod saved;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::config::Environment;
use crate::state::AppState;

/// What the client needs to know about this deployment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub environment: Environment,
    pub recommendation_webhook_url: String,
}

/// GET /api/client-config
pub async fn client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    let config = state.config();
    Json(ClientConfig {
        environment: config.environment,
        recommendation_webhook_url: config.recommendation_webhook().to_string(),
    })
}
