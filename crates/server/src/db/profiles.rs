//! Profile documents.
//!
//! The `data` column holds whatever JSON was last written; it is passed
//! through the profile sanitizer on every read, so older or hand-edited
//! documents still come out in canonical shape.

use serde_json::Value;
use sqlx::{PgExecutor, PgPool};

use bocado_core::profile::normalize_language;
use bocado_core::{UserId, UserProfile, sanitize_profile_data};

use super::RepositoryError;

/// A user's stored profile plus their language preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    pub profile: UserProfile,
    pub language: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    data: Value,
    language: String,
}

impl From<ProfileRow> for StoredProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            profile: sanitize_profile_data(Some(&row.data)),
            language: normalize_language(Some(&row.language)),
        }
    }
}

/// Insert or replace the profile document of `user`.
pub(crate) async fn upsert_profile<'e, E>(
    executor: E,
    user: UserId,
    profile: &UserProfile,
    language: &str,
) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    let data = serde_json::to_value(profile)
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable profile: {e}")))?;

    sqlx::query(
        r"
        INSERT INTO bocado.profiles (user_id, data, language)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id)
        DO UPDATE SET data = EXCLUDED.data, language = EXCLUDED.language, updated_at = now()
        ",
    )
    .bind(user)
    .bind(data)
    .bind(language)
    .execute(executor)
    .await?;

    Ok(())
}

/// Repository for profile documents.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the sanitized profile of `user`, if one was ever stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user: UserId) -> Result<Option<StoredProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT data, language FROM bocado.profiles WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(StoredProfile::from))
    }

    /// Store an already-sanitized profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user: UserId,
        profile: &UserProfile,
        language: &str,
    ) -> Result<(), RepositoryError> {
        upsert_profile(self.pool, user, profile, language).await
    }
}
