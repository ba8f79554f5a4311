//! Session-scoped pantry state with optimistic writes.
//!
//! Each signed-in user's inventory is loaded once into a [`PantrySessions`]
//! entry and served from memory afterwards. Writes are applied to the
//! in-memory model first, then persisted; when persistence fails the change
//! is reverted so the model never drifts from storage.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use bocado_core::{
    CategoryFilter, KitchenItem, KitchenItemId, KitchenItemPatch, NewKitchenItem, Pantry,
    PantryError, UserId, Zone, ZoneSummary,
};

use crate::db::{PantryRepository, RepositoryError};

/// Idle time after which a user's pantry is dropped from memory.
pub const PANTRY_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// Persistence behind the pantry model.
pub trait PantryStore: Sync {
    fn load_items(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<KitchenItem>, RepositoryError>> + Send;

    fn insert_item(
        &self,
        user: UserId,
        item: &KitchenItem,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist the fields named by `patch`, taking values from `item`.
    fn update_item(
        &self,
        user: UserId,
        patch: &KitchenItemPatch,
        item: &KitchenItem,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_item(
        &self,
        user: UserId,
        id: KitchenItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl PantryStore for PantryRepository<'_> {
    fn load_items(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<KitchenItem>, RepositoryError>> + Send {
        self.list(user)
    }

    fn insert_item(
        &self,
        user: UserId,
        item: &KitchenItem,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.insert(user, item)
    }

    fn update_item(
        &self,
        user: UserId,
        patch: &KitchenItemPatch,
        item: &KitchenItem,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.update(user, patch, item)
    }

    fn delete_item(
        &self,
        user: UserId,
        id: KitchenItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.delete(user, id)
    }
}

/// Errors from pantry operations.
#[derive(Debug, Error)]
pub enum PantryServiceError {
    /// The change is invalid for the current model.
    #[error(transparent)]
    Pantry(#[from] PantryError),

    /// Loading or persisting failed; the model is unchanged.
    #[error("pantry storage error: {0}")]
    Repository(#[from] RepositoryError),
}

type SharedPantry = Arc<Mutex<Pantry>>;

/// Per-user in-memory pantry models.
///
/// Entries are created lazily on first use after login, removed on logout,
/// and expire after [`PANTRY_SESSION_IDLE`] without access.
#[derive(Clone)]
pub struct PantrySessions {
    models: Cache<UserId, SharedPantry>,
}

impl PantrySessions {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self {
            models: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// The model of `user`, loading it from `store` on first use.
    async fn model<S: PantryStore>(
        &self,
        store: &S,
        user: UserId,
    ) -> Result<SharedPantry, RepositoryError> {
        if let Some(model) = self.models.get(&user).await {
            return Ok(model);
        }

        let items = store.load_items(user).await?;
        info!(user = %user, items = items.len(), "Loaded pantry");
        let loaded = Arc::new(Mutex::new(Pantry::from_items(items)));

        // A concurrent load may have won the race; keep whichever landed first
        Ok(self.models.entry(user).or_insert(loaded).await.into_value())
    }

    /// Forget the model of `user` (logout, or storage out of sync).
    pub async fn invalidate(&self, user: UserId) {
        self.models.invalidate(&user).await;
    }
}

impl Default for PantrySessions {
    fn default() -> Self {
        Self::new(PANTRY_SESSION_IDLE)
    }
}

/// Pantry operations for one request.
pub struct PantryService<'a, S> {
    sessions: &'a PantrySessions,
    store: S,
}

impl<'a, S: PantryStore> PantryService<'a, S> {
    #[must_use]
    pub const fn new(sessions: &'a PantrySessions, store: S) -> Self {
        Self { sessions, store }
    }

    /// Zone list with item counts and urgency badges.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Repository` if the pantry cannot be loaded.
    pub async fn zones(&self, user: UserId) -> Result<Vec<ZoneSummary>, PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let pantry = model.lock().await;
        Ok(pantry.zone_summaries())
    }

    /// Item grid of `zone` under the active category.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Repository` if the pantry cannot be loaded.
    pub async fn items(
        &self,
        user: UserId,
        zone: Zone,
        filter: &CategoryFilter,
    ) -> Result<Vec<KitchenItem>, PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let pantry = model.lock().await;
        Ok(pantry.items_in(zone, filter).into_iter().cloned().collect())
    }

    /// Category tabs of `zone`.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Repository` if the pantry cannot be loaded.
    pub async fn categories(
        &self,
        user: UserId,
        zone: Zone,
    ) -> Result<Vec<String>, PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let pantry = model.lock().await;
        Ok(pantry
            .categories(zone)
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    /// Add an item.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Pantry` for an invalid item and
    /// `PantryServiceError::Repository` if it could not be stored.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn add(
        &self,
        user: UserId,
        new_item: NewKitchenItem,
    ) -> Result<KitchenItem, PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let mut pantry = model.lock().await;

        let item = new_item.into_item(KitchenItemId::generate(), Utc::now())?;
        let change = pantry.add(item.clone())?;

        if let Err(e) = self.store.insert_item(user, &item).await {
            warn!(item = %item.id, error = %e, "Reverting pantry add");
            pantry.revert(change);
            return Err(e.into());
        }

        Ok(item)
    }

    /// Apply a partial update, e.g. a freshness toggle.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Pantry` for an unknown item or invalid
    /// patch and `PantryServiceError::Repository` if it could not be stored.
    #[instrument(skip_all, fields(user = %user, item = %id))]
    pub async fn update(
        &self,
        user: UserId,
        id: KitchenItemId,
        patch: &KitchenItemPatch,
    ) -> Result<KitchenItem, PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let mut pantry = model.lock().await;

        let change = pantry.update(id, patch)?;
        let updated = pantry.get(id).cloned().ok_or(PantryError::NotFound(id))?;

        if let Err(e) = self.store.update_item(user, patch, &updated).await {
            warn!(error = %e, "Reverting pantry update");
            pantry.revert(change);
            drop(pantry);
            self.forget_if_stale(user, &e).await;
            return Err(e.into());
        }

        Ok(updated)
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `PantryServiceError::Pantry` for an unknown item and
    /// `PantryServiceError::Repository` if it could not be deleted.
    #[instrument(skip_all, fields(user = %user, item = %id))]
    pub async fn remove(&self, user: UserId, id: KitchenItemId) -> Result<(), PantryServiceError> {
        let model = self.sessions.model(&self.store, user).await?;
        let mut pantry = model.lock().await;

        let change = pantry.remove(id)?;

        if let Err(e) = self.store.delete_item(user, id).await {
            warn!(error = %e, "Reverting pantry delete");
            pantry.revert(change);
            drop(pantry);
            self.forget_if_stale(user, &e).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// An item missing from storage means another device changed it; reload
    /// next time.
    async fn forget_if_stale(&self, user: UserId, error: &RepositoryError) {
        if matches!(error, RepositoryError::NotFound) {
            self.sessions.invalidate(user).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use bocado_core::Freshness;

    use super::*;

    /// In-memory store; writes fail while `fail_writes` is set.
    #[derive(Default)]
    struct FakeStore {
        items: std::sync::Mutex<HashMap<UserId, Vec<KitchenItem>>>,
        fail_writes: AtomicBool,
        loads: AtomicUsize,
    }

    impl FakeStore {
        fn stored(&self, user: UserId) -> Vec<KitchenItem> {
            self.items.lock().unwrap().get(&user).cloned().unwrap_or_default()
        }

        fn write(&self) -> Result<(), RepositoryError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    impl PantryStore for FakeStore {
        fn load_items(
            &self,
            user: UserId,
        ) -> impl Future<Output = Result<Vec<KitchenItem>, RepositoryError>> + Send {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let items = self.stored(user);
            async move { Ok(items) }
        }

        fn insert_item(
            &self,
            user: UserId,
            item: &KitchenItem,
        ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
            let result = self.write().map(|()| {
                self.items
                    .lock()
                    .unwrap()
                    .entry(user)
                    .or_default()
                    .push(item.clone());
            });
            async move { result }
        }

        fn update_item(
            &self,
            user: UserId,
            _patch: &KitchenItemPatch,
            item: &KitchenItem,
        ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
            let result = self.write().and_then(|()| {
                let mut items = self.items.lock().unwrap();
                let stored = items
                    .entry(user)
                    .or_default()
                    .iter_mut()
                    .find(|stored| stored.id == item.id)
                    .ok_or(RepositoryError::NotFound)?;
                *stored = item.clone();
                Ok(())
            });
            async move { result }
        }

        fn delete_item(
            &self,
            user: UserId,
            id: KitchenItemId,
        ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
            let result = self.write().map(|()| {
                self.items
                    .lock()
                    .unwrap()
                    .entry(user)
                    .or_default()
                    .retain(|item| item.id != id);
            });
            async move { result }
        }
    }

    fn new_item(name: &str, zone: Zone, freshness: Freshness) -> NewKitchenItem {
        NewKitchenItem {
            name: name.to_owned(),
            zone,
            category: "Lácteos".to_owned(),
            quantity: 1,
            freshness,
            emoji: String::new(),
        }
    }

    fn badge(zones: &[ZoneSummary], zone: Zone) -> usize {
        zones.iter().find(|z| z.zone == zone).unwrap().urgent_count
    }

    #[tokio::test]
    async fn test_add_persists_and_updates_badges() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();

        service
            .add(user, new_item("Yogur", Zone::Nevera, Freshness::Fresh))
            .await
            .unwrap();
        assert_eq!(badge(&service.zones(user).await.unwrap(), Zone::Nevera), 0);

        service
            .add(user, new_item("Leche", Zone::Nevera, Freshness::Soon))
            .await
            .unwrap();
        let zones = service.zones(user).await.unwrap();
        assert_eq!(badge(&zones, Zone::Nevera), 1);
        assert_eq!(badge(&zones, Zone::Despensa), 0);
        assert_eq!(service.store.stored(user).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_add_is_reverted() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();
        service.store.fail_writes.store(true, Ordering::SeqCst);

        let result = service
            .add(user, new_item("Queso", Zone::Nevera, Freshness::Expired))
            .await;
        assert!(matches!(result, Err(PantryServiceError::Repository(_))));

        let items = service
            .items(user, Zone::Nevera, &CategoryFilter::All)
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(badge(&service.zones(user).await.unwrap(), Zone::Nevera), 0);
    }

    #[tokio::test]
    async fn test_failed_update_is_reverted() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();
        let item = service
            .add(user, new_item("Huevos", Zone::Nevera, Freshness::Fresh))
            .await
            .unwrap();

        service.store.fail_writes.store(true, Ordering::SeqCst);
        let result = service
            .update(user, item.id, &KitchenItemPatch::freshness(Freshness::Expired))
            .await;
        assert!(result.is_err());

        let items = service
            .items(user, Zone::Nevera, &CategoryFilter::All)
            .await
            .unwrap();
        assert_eq!(items, vec![item]);
    }

    #[tokio::test]
    async fn test_failed_remove_is_reverted_in_place() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();
        let mut ids = Vec::new();
        for name in ["Arroz", "Lentejas", "Pasta"] {
            let item = service
                .add(user, new_item(name, Zone::Despensa, Freshness::Fresh))
                .await
                .unwrap();
            ids.push(item.id);
        }

        service.store.fail_writes.store(true, Ordering::SeqCst);
        assert!(service.remove(user, ids[1]).await.is_err());

        let order: Vec<_> = service
            .items(user, Zone::Despensa, &CategoryFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(order, ids);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();
        let item = service
            .add(user, new_item("Guisantes", Zone::Congelador, Freshness::Fresh))
            .await
            .unwrap();

        let updated = service
            .update(user, item.id, &KitchenItemPatch::freshness(Freshness::Soon))
            .await
            .unwrap();
        assert_eq!(updated.freshness, Freshness::Soon);
        assert_eq!(service.store.stored(user)[0].freshness, Freshness::Soon);

        service.remove(user, item.id).await.unwrap();
        assert!(service.store.stored(user).is_empty());
        assert!(matches!(
            service.remove(user, item.id).await,
            Err(PantryServiceError::Pantry(PantryError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_model_loaded_once_until_invalidated() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();

        service.zones(user).await.unwrap();
        service.categories(user, Zone::Nevera).await.unwrap();
        assert_eq!(service.store.loads.load(Ordering::SeqCst), 1);

        sessions.invalidate(user).await;
        service.zones(user).await.unwrap();
        assert_eq!(service.store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_model_dropped_when_storage_lost_item() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let user = UserId::generate();
        let item = service
            .add(user, new_item("Mantequilla", Zone::Nevera, Freshness::Fresh))
            .await
            .unwrap();

        // Deleted from another device
        service.store.items.lock().unwrap().clear();

        let result = service
            .update(user, item.id, &KitchenItemPatch::freshness(Freshness::Soon))
            .await;
        assert!(matches!(
            result,
            Err(PantryServiceError::Repository(RepositoryError::NotFound))
        ));

        let items = service
            .items(user, Zone::Nevera, &CategoryFilter::All)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let sessions = PantrySessions::default();
        let service = PantryService::new(&sessions, FakeStore::default());
        let (ana, luis) = (UserId::generate(), UserId::generate());

        service
            .add(ana, new_item("Tomate", Zone::Nevera, Freshness::Soon))
            .await
            .unwrap();

        assert_eq!(badge(&service.zones(luis).await.unwrap(), Zone::Nevera), 0);
        assert!(service.categories(luis, Zone::Nevera).await.unwrap().is_empty());
        assert_eq!(
            service.categories(ana, Zone::Nevera).await.unwrap(),
            vec!["Lácteos".to_owned()]
        );
    }
}
