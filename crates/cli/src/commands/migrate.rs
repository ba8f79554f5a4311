//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply the schema migrations and create the session table
//! bocado migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BOCADO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Schema migrations live in `crates/server/migrations/` and are embedded
//! into the binary at compile time.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Run all migrations: the `bocado` schema, then the session store table.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running schema migrations...");
    bocado_server::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
