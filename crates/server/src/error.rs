//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bocado_core::{PantryError, SavedItemError};

use crate::db::RepositoryError;
use crate::services::auth::{AuthError, MSG_GENERIC};
use crate::services::pantry::PantryServiceError;

/// Shown when a route needs a signed-in user.
pub const MSG_SIGN_IN: &str = "Inicia sesión para continuar";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Pantry change rejected.
    #[error("Pantry error: {0}")]
    Pantry(#[from] PantryError),

    /// Saved item rejected.
    #[error("Saved item error: {0}")]
    Saved(#[from] SavedItemError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User may not act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

}

impl From<PantryServiceError> for AppError {
    fn from(error: PantryServiceError) -> Self {
        match error {
            PantryServiceError::Pantry(e) => Self::Pantry(e),
            PantryServiceError::Repository(e) => Self::Database(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Pantry(err) => match err {
                PantryError::NotFound(_) => StatusCode::NOT_FOUND,
                PantryError::DuplicateId(_) => StatusCode::CONFLICT,
                PantryError::EmptyName
                | PantryError::EmptyPatch
                | PantryError::InvalidZone(_)
                | PantryError::InvalidFreshness(_)
                | PantryError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
            },
            Self::Saved(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message shown to the client; internal detail never leaves the server.
    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(_) | Self::Session(_) => MSG_GENERIC.to_string(),
            Self::Unauthorized(message) => message.clone(),
            Self::Auth(err) => err.user_message(),
            Self::Pantry(err) => err.to_string(),
            Self::Saved(err) => err.to_string(),
            _ => self.to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound | RepositoryError::Conflict(_)) => false,
            Self::Database(_) | Self::Session(_) => true,
            Self::Auth(err) => !err.is_client_error(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
