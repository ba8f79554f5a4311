//! Authentication route handlers.
//!
//! Registration takes the combined sign-up form (account fields plus the
//! profile wizard's answers) and signs the new user in.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use bocado_core::RegistrationForm;

use crate::db::UserRepository;
use crate::error::{AppError, MSG_SIGN_IN, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body returned after a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
}

async fn sign_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Register a new account.
///
/// POST /api/auth/register
///
/// # Errors
///
/// Returns `AppError::Auth` for validation failures or a taken email.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let user = AuthService::new(state.pool()).register(form).await?;
    info!(user_id = %user.id, "User registered");

    sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user })))
}

/// Sign in with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns `AppError::Auth` with `InvalidCredentials` for any wrong pair.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;
    info!(user_id = %user.id, "User logged in");

    sign_in(&session, &user).await?;
    Ok(Json(SessionResponse { user }))
}

/// Sign out and drop the user's session-scoped state.
///
/// POST /api/auth/logout
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be cleared.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<StatusCode> {
    if let Some(user) = user {
        state.pantry_sessions().invalidate(user.id).await;
        state.flag_cache().invalidate(Some(user.id)).await;
        info!(user_id = %user.id, "User logged out");
    }

    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, read fresh from the store.
///
/// GET /api/auth/session
///
/// A session whose user no longer exists is cleared.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` without a live session and
/// `AppError::Database` if the user cannot be read.
pub async fn current(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<SessionResponse>> {
    match UserRepository::new(state.pool()).get_by_id(current.id).await? {
        Some(user) => Ok(Json(SessionResponse { user })),
        None => {
            info!(user_id = %current.id, "Session user no longer exists");
            clear_current_user(&session).await?;
            clear_sentry_user();
            Err(AppError::Unauthorized(MSG_SIGN_IN.to_owned()))
        }
    }
}
