//! Kitchen item storage.
//!
//! Partial updates only touch the supplied columns, so concurrent edits from
//! two devices resolve last-write-wins per field.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bocado_core::{KitchenItem, KitchenItemId, KitchenItemPatch, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct KitchenItemRow {
    id: Uuid,
    name: String,
    zone: String,
    category: String,
    quantity: i32,
    freshness: String,
    emoji: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<KitchenItemRow> for KitchenItem {
    type Error = RepositoryError;

    fn try_from(row: KitchenItemRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid kitchen item {}: {e}", row.id))
        };

        Ok(Self {
            id: KitchenItemId::new(row.id),
            zone: row.zone.parse().map_err(|e| corrupt(&e))?,
            freshness: row.freshness.parse().map_err(|e| corrupt(&e))?,
            quantity: u32::try_from(row.quantity).map_err(|e| corrupt(&e))?,
            name: row.name,
            category: row.category,
            emoji: row.emoji,
            created_at: row.created_at,
        })
    }
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {quantity} out of range")))
}

/// Repository for pantry items.
pub struct PantryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PantryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All items of `user` in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list(&self, user: UserId) -> Result<Vec<KitchenItem>, RepositoryError> {
        sqlx::query_as::<_, KitchenItemRow>(
            r"
            SELECT id, name, zone, category, quantity, freshness, emoji, created_at
            FROM bocado.kitchen_items
            WHERE user_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(KitchenItem::try_from)
        .collect()
    }

    /// Insert a new item owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, user: UserId, item: &KitchenItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bocado.kitchen_items
                (id, user_id, name, zone, category, quantity, freshness, emoji, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(item.id)
        .bind(user)
        .bind(&item.name)
        .bind(item.zone.as_str())
        .bind(&item.category)
        .bind(quantity_param(item.quantity)?)
        .bind(item.freshness.as_str())
        .bind(&item.emoji)
        .bind(item.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "kitchen item already exists"))?;

        Ok(())
    }

    /// Write the supplied fields of `patch`; `item` carries their normalized
    /// values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `user` owns no such item.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        user: UserId,
        patch: &KitchenItemPatch,
        item: &KitchenItem,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bocado.kitchen_items
            SET name = COALESCE($3, name),
                zone = COALESCE($4, zone),
                category = COALESCE($5, category),
                quantity = COALESCE($6, quantity),
                freshness = COALESCE($7, freshness),
                emoji = COALESCE($8, emoji),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(item.id)
        .bind(user)
        .bind(patch.name.as_ref().map(|_| &item.name))
        .bind(patch.zone.map(|_| item.zone.as_str()))
        .bind(patch.category.as_ref().map(|_| &item.category))
        .bind(patch.quantity.map(|_| quantity_param(item.quantity)).transpose()?)
        .bind(patch.freshness.map(|_| item.freshness.as_str()))
        .bind(patch.emoji.as_ref().map(|_| &item.emoji))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an item owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `user` owns no such item.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, user: UserId, id: KitchenItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bocado.kitchen_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
