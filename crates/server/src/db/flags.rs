//! Feature flag documents.
//!
//! One row per layer: `global` for the admin-controlled layer and
//! `users/{uid}` for a user's own overrides. Each document has the shape
//! `{"flags": {"<name>": <bool>, ...}}`.

use std::fmt;

use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use bocado_core::{FeatureFlag, FlagOverrides, UserId};

use super::RepositoryError;

/// Which override layer a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagScope {
    Global,
    User(UserId),
}

impl fmt::Display for FlagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::User(id) => write!(f, "users/{id}"),
        }
    }
}

impl From<Option<UserId>> for FlagScope {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Global, Self::User)
    }
}

/// Repository for flag override documents.
#[derive(Clone, Copy)]
pub struct FlagRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FlagRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Raw document of `scope`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_document(&self, scope: FlagScope) -> Result<Option<Value>, RepositoryError> {
        let document = sqlx::query_scalar::<_, Value>(
            "SELECT document FROM bocado.feature_flags WHERE scope = $1",
        )
        .bind(scope.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    /// Set one override in `scope`, creating the document if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_override(
        &self,
        scope: FlagScope,
        flag: FeatureFlag,
        value: bool,
    ) -> Result<FlagOverrides, RepositoryError> {
        self.modify(scope, |overrides| overrides.set(flag, value))
            .await
    }

    /// Remove one override from `scope`, so the lower layer shows through.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unset_override(
        &self,
        scope: FlagScope,
        flag: FeatureFlag,
    ) -> Result<FlagOverrides, RepositoryError> {
        self.modify(scope, |overrides| {
            overrides.unset(flag);
        })
        .await
    }

    /// Read-modify-write of one document under a row lock.
    async fn modify<F>(&self, scope: FlagScope, change: F) -> Result<FlagOverrides, RepositoryError>
    where
        F: FnOnce(&mut FlagOverrides) + Send,
    {
        let key = scope.to_string();
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, Value>(
            "SELECT document FROM bocado.feature_flags WHERE scope = $1 FOR UPDATE",
        )
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let mut overrides = current
            .as_ref()
            .map(|document| decode_document(scope, document))
            .unwrap_or_default();
        change(&mut overrides);

        sqlx::query(
            r"
            INSERT INTO bocado.feature_flags (scope, document)
            VALUES ($1, $2)
            ON CONFLICT (scope)
            DO UPDATE SET document = EXCLUDED.document, updated_at = now()
            ",
        )
        .bind(&key)
        .bind(overrides.to_document())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(overrides)
    }
}

/// Decode a stored document, logging and dropping whatever is invalid.
pub fn decode_document(scope: FlagScope, document: &Value) -> FlagOverrides {
    match FlagOverrides::from_document(document) {
        Ok(decoded) => {
            for skipped in &decoded.skipped {
                warn!(%scope, %skipped, "Ignoring invalid flag entry");
            }
            decoded.overrides
        }
        Err(error) => {
            warn!(%scope, %error, "Ignoring malformed flag document");
            FlagOverrides::new()
        }
    }
}
