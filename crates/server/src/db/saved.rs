//! Saved recipes and restaurants.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use bocado_core::{SavedItem, SavedItemId, SavedKind, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct SavedItemRow {
    id: String,
    user_id: Uuid,
    kind: String,
    title: String,
    data: Value,
    saved_at: DateTime<Utc>,
}

impl TryFrom<SavedItemRow> for SavedItem {
    type Error = RepositoryError;

    fn try_from(row: SavedItemRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse::<SavedKind>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid saved item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: SavedItemId::from_raw(row.id),
            user_id: UserId::new(row.user_id),
            kind,
            title: row.title,
            data: row.data,
            saved_at: row.saved_at,
        })
    }
}

/// Repository for saved items.
pub struct SavedItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SavedItemRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Saved items of `user`, newest first, optionally of one kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list(
        &self,
        user: UserId,
        kind: Option<SavedKind>,
    ) -> Result<Vec<SavedItem>, RepositoryError> {
        sqlx::query_as::<_, SavedItemRow>(
            r"
            SELECT id, user_id, kind, title, data, saved_at
            FROM bocado.saved_items
            WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)
            ORDER BY saved_at DESC, id
            ",
        )
        .bind(user)
        .bind(kind.map(SavedKind::as_str))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(SavedItem::try_from)
        .collect()
    }

    /// Insert or overwrite a saved item; the id makes repeated saves land
    /// on the same row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, item: &SavedItem) -> Result<SavedItem, RepositoryError> {
        let row = sqlx::query_as::<_, SavedItemRow>(
            r"
            INSERT INTO bocado.saved_items (id, user_id, kind, title, data, saved_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET kind = EXCLUDED.kind,
                          title = EXCLUDED.title,
                          data = EXCLUDED.data,
                          saved_at = EXCLUDED.saved_at
            WHERE saved_items.user_id = EXCLUDED.user_id
            RETURNING id, user_id, kind, title, data, saved_at
            ",
        )
        .bind(item.id.as_str())
        .bind(item.user_id)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(&item.data)
        .bind(item.saved_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(SavedItem::try_from)
            .transpose()?
            .ok_or_else(|| RepositoryError::Conflict("saved item owned by another user".to_owned()))
    }

    /// Delete a saved item owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `user` owns no such item.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, user: UserId, id: &SavedItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bocado.saved_items WHERE id = $1 AND user_id = $2")
            .bind(id.as_str())
            .bind(user)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
