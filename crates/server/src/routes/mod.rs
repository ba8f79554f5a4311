//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness
//! GET    /health/ready              - Database connectivity
//! GET    /api/client-config         - Environment and recommendation webhook
//!
//! # Auth
//! POST   /api/auth/register         - Combined registration form
//! POST   /api/auth/login            - Email + password
//! POST   /api/auth/logout
//! GET    /api/auth/session          - Signed-in user
//!
//! # Flags (anonymous allowed)
//! GET    /api/flags[?refresh=true]
//! GET    /api/flags/{name}
//!
//! # Profile (requires auth)
//! GET    /api/profile
//! PUT    /api/profile
//!
//! # Pantry (requires auth)
//! GET    /api/pantry/zones
//! GET    /api/pantry/items?zone=&category=
//! POST   /api/pantry/items
//! PATCH  /api/pantry/items/{id}
//! DELETE /api/pantry/items/{id}
//! GET    /api/pantry/categories?zone=
//!
//! # Saved items (requires auth)
//! GET    /api/saved[?type=]
//! POST   /api/saved
//! DELETE /api/saved/{id}
//!
//! # Recommendations (requires auth)
//! POST   /api/recommendations
//! ```

pub mod api;
pub mod auth;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
        .route("/session", get(auth::current).layer(api_rate_limiter()))
}

/// Create the pantry routes router.
pub fn pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/zones", get(api::pantry::zones))
        .route("/items", get(api::pantry::items).post(api::pantry::create))
        .route(
            "/items/{id}",
            delete(api::pantry::delete).patch(api::pantry::update),
        )
        .route("/categories", get(api::pantry::categories))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/client-config", get(api::client_config))
        .route("/flags", get(api::flags::list))
        .route("/flags/{name}", get(api::flags::show))
        .route(
            "/profile",
            get(api::profile::show).put(api::profile::update),
        )
        .nest("/pantry", pantry_routes())
        .route("/saved", get(api::saved::list).post(api::saved::save))
        .route("/saved/{id}", delete(api::saved::delete))
        .route("/recommendations", post(api::recommendations::create))
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes())
}

/// Build the full application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
