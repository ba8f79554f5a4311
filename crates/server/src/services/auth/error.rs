//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Shown for a wrong email/password pair.
pub const MSG_INVALID_CREDENTIALS: &str = "Correo o contraseña incorrectos";
/// Shown when registering an email that already has an account.
pub const MSG_EMAIL_IN_USE: &str = "Ya existe una cuenta con este correo";
/// Shown for every failure the user cannot act on.
pub const MSG_GENERIC: &str = "No se pudo completar la solicitud";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bocado_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show the user. Raw detail stays in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => MSG_INVALID_CREDENTIALS.to_owned(),
            Self::UserAlreadyExists => MSG_EMAIL_IN_USE.to_owned(),
            Self::InvalidEmail(_) => "El correo no es válido".to_owned(),
            Self::WeakPassword(_) => "La contraseña debe tener al menos 6 caracteres".to_owned(),
            Self::PasswordMismatch => "Las contraseñas no coinciden".to_owned(),
            Self::Repository(_) | Self::PasswordHash => MSG_GENERIC.to_owned(),
        }
    }

    /// Whether the failure is the client's to fix.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
