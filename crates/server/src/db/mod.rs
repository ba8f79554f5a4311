//! Database operations for Bocado `PostgreSQL`.
//!
//! # Schema: `bocado`
//!
//! ## Tables
//!
//! - `users` - Account credentials
//! - `profiles` - Sanitized profile document and language per user
//! - `feature_flags` - Global and per-user flag override documents
//! - `kitchen_items` - Pantry inventory
//! - `saved_items` - Saved recipes and restaurants
//! - `tower_sessions.session` - Session storage (created by the store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bocado-cli -- migrate
//! ```

pub mod flags;
pub mod pantry;
pub mod profiles;
pub mod saved;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use flags::{FlagRepository, FlagScope};
pub use pantry::PantryRepository;
pub use profiles::ProfileRepository;
pub use saved::SavedItemRepository;
pub use users::UserRepository;

/// Embedded SQL migrations for the `bocado` schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data failed validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, everything else to `Database`.
    pub(crate) fn from_insert(error: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(error)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
