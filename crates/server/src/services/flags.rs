//! Feature flag resolution.
//!
//! Loads the Global and User layers concurrently and resolves them against
//! the compiled-in defaults. Store failures never surface: the failing layer
//! is logged and treated as empty, so the lower layers show through.
//!
//! Resolved maps are cached per user for the client's stale time in
//! [`FlagCache`].

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use bocado_core::flags::{have_flags_changed, resolve_flags};
use bocado_core::{FeatureFlag, FeatureFlags, FlagOverrides, UserId};

use crate::db::flags::decode_document;
use crate::db::{FlagRepository, FlagScope, RepositoryError};

/// How long a resolved flag map is served from cache.
pub const FLAG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Where flag documents come from.
pub trait FlagSource: Sync {
    /// Raw document stored for `scope`, `None` if there is none.
    fn load_document(
        &self,
        scope: FlagScope,
    ) -> impl Future<Output = Result<Option<Value>, RepositoryError>> + Send;
}

impl FlagSource for FlagRepository<'_> {
    fn load_document(
        &self,
        scope: FlagScope,
    ) -> impl Future<Output = Result<Option<Value>, RepositoryError>> + Send {
        self.get_document(scope)
    }
}

/// Resolves flag layers from a [`FlagSource`].
pub struct FlagResolver<S> {
    source: S,
}

impl<S: FlagSource> FlagResolver<S> {
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Load one layer; a missing or unreadable document is an empty layer.
    async fn load_layer(&self, scope: FlagScope) -> FlagOverrides {
        match self.source.load_document(scope).await {
            Ok(Some(document)) => decode_document(scope, &document),
            Ok(None) => FlagOverrides::new(),
            Err(e) => {
                warn!(%scope, error = %e, "Failed to load flag layer, falling back");
                FlagOverrides::new()
            }
        }
    }

    /// Load the Global layer and, for a signed-in user, their User layer.
    async fn load_layers(&self, user: Option<UserId>) -> (FlagOverrides, FlagOverrides) {
        match user {
            Some(id) => {
                tokio::join!(
                    self.load_layer(FlagScope::Global),
                    self.load_layer(FlagScope::User(id))
                )
            }
            None => (self.load_layer(FlagScope::Global).await, FlagOverrides::new()),
        }
    }

    /// Every flag's effective value for `user` (or an anonymous visitor).
    #[instrument(skip(self))]
    pub async fn resolve(&self, user: Option<UserId>) -> FeatureFlags {
        let (global, user_layer) = self.load_layers(user).await;
        let flags = resolve_flags(&global, &user_layer);
        debug!(?flags, "Resolved feature flags");
        flags
    }

    /// Effective value of a single flag, read past any cache.
    pub async fn is_enabled(&self, flag: FeatureFlag, user: Option<UserId>) -> bool {
        let (global, user_layer) = self.load_layers(user).await;
        bocado_core::flags::is_feature_enabled(flag, &global, &user_layer)
    }
}

/// Resolved flag maps keyed by user, `None` for anonymous visitors.
#[derive(Clone)]
pub struct FlagCache {
    cache: Cache<Option<UserId>, FeatureFlags>,
}

/// Outcome of a forced refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRefresh {
    pub flags: FeatureFlags,
    /// Whether the map differs from what was cached before.
    pub changed: bool,
}

impl FlagCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached map for `user`, resolving on a miss.
    pub async fn get<S: FlagSource>(
        &self,
        resolver: &FlagResolver<S>,
        user: Option<UserId>,
    ) -> FeatureFlags {
        self.cache.get_with(user, resolver.resolve(user)).await
    }

    /// Re-resolve regardless of the cache and report whether anything moved.
    pub async fn refresh<S: FlagSource>(
        &self,
        resolver: &FlagResolver<S>,
        user: Option<UserId>,
    ) -> FlagRefresh {
        let previous = self.cache.get(&user).await;
        let flags = resolver.resolve(user).await;
        let changed = previous
            .as_ref()
            .is_some_and(|previous| have_flags_changed(previous, &flags));
        self.cache.insert(user, flags.clone()).await;
        FlagRefresh { flags, changed }
    }

    /// Drop the cached map of `user`.
    pub async fn invalidate(&self, user: Option<UserId>) {
        self.cache.invalidate(&user).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    /// In-memory flag store; scopes listed in `failing` return an error.
    #[derive(Default)]
    struct FakeSource {
        documents: Mutex<HashMap<FlagScope, Value>>,
        failing: Vec<FlagScope>,
        loads: AtomicUsize,
    }

    impl FakeSource {
        fn with(documents: impl IntoIterator<Item = (FlagScope, Value)>) -> Self {
            Self {
                documents: Mutex::new(documents.into_iter().collect()),
                ..Self::default()
            }
        }

        fn put(&self, scope: FlagScope, document: Value) {
            self.documents.lock().unwrap().insert(scope, document);
        }
    }

    impl FlagSource for FakeSource {
        fn load_document(
            &self,
            scope: FlagScope,
        ) -> impl Future<Output = Result<Option<Value>, RepositoryError>> + Send {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let result = if self.failing.contains(&scope) {
                Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(self.documents.lock().unwrap().get(&scope).cloned())
            };
            async move { result }
        }
    }

    #[tokio::test]
    async fn test_defaults_without_documents() {
        let resolver = FlagResolver::new(FakeSource::default());
        let flags = resolver.resolve(Some(UserId::generate())).await;
        assert_eq!(flags, FeatureFlags::defaults());
        assert!(flags.get(FeatureFlag::EnableAnalytics));
        assert!(!flags.get(FeatureFlag::MealPlanner));
    }

    #[tokio::test]
    async fn test_user_layer_wins_over_global() {
        let user = UserId::generate();
        let resolver = FlagResolver::new(FakeSource::with([
            (
                FlagScope::Global,
                json!({"flags": {"mealPlanner": true, "pantryV2": true}}),
            ),
            (FlagScope::User(user), json!({"flags": {"mealPlanner": false}})),
        ]));

        let flags = resolver.resolve(Some(user)).await;
        assert!(!flags.get(FeatureFlag::MealPlanner));
        assert!(flags.get(FeatureFlag::PantryV2));
        assert!(resolver.is_enabled(FeatureFlag::PantryV2, Some(user)).await);
    }

    #[tokio::test]
    async fn test_anonymous_reads_global_only() {
        let user = UserId::generate();
        let source = FakeSource::with([(FlagScope::User(user), json!({"flags": {"debugMode": true}}))]);
        let resolver = FlagResolver::new(source);

        assert!(!resolver.resolve(None).await.get(FeatureFlag::DebugMode));
        assert_eq!(resolver.source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_layer_falls_back() {
        let user = UserId::generate();
        let source = FakeSource {
            failing: vec![FlagScope::User(user)],
            ..FakeSource::with([(FlagScope::Global, json!({"flags": {"debugMode": true}}))])
        };
        let resolver = FlagResolver::new(source);

        let flags = resolver.resolve(Some(user)).await;
        assert!(flags.get(FeatureFlag::DebugMode));
    }

    #[tokio::test]
    async fn test_everything_failing_yields_defaults() {
        let user = UserId::generate();
        let resolver = FlagResolver::new(FakeSource {
            failing: vec![FlagScope::Global, FlagScope::User(user)],
            ..FakeSource::default()
        });
        assert_eq!(resolver.resolve(Some(user)).await, FeatureFlags::defaults());
    }

    #[tokio::test]
    async fn test_malformed_document_ignored() {
        let resolver = FlagResolver::new(FakeSource::with([(
            FlagScope::Global,
            json!({"flags": {"pantryV2": "on", "unknownFlag": true}}),
        )]));
        assert_eq!(resolver.resolve(None).await, FeatureFlags::defaults());
    }

    #[tokio::test]
    async fn test_cache_serves_until_refresh() {
        let resolver = FlagResolver::new(FakeSource::default());
        let cache = FlagCache::new(FLAG_CACHE_TTL);

        let first = cache.get(&resolver, None).await;
        resolver
            .source
            .put(FlagScope::Global, json!({"flags": {"mealPlanner": true}}));

        // Still cached
        assert_eq!(cache.get(&resolver, None).await, first);

        let refresh = cache.refresh(&resolver, None).await;
        assert!(refresh.changed);
        assert!(refresh.flags.get(FeatureFlag::MealPlanner));
        assert_eq!(cache.get(&resolver, None).await, refresh.flags);

        let again = cache.refresh(&resolver, None).await;
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn test_is_enabled_sees_changes_the_cache_hides() {
        let user = UserId::generate();
        let resolver = FlagResolver::new(FakeSource::default());
        let cache = FlagCache::new(FLAG_CACHE_TTL);

        assert!(cache.get(&resolver, Some(user)).await.get(FeatureFlag::SavedRestaurants));
        resolver.source.put(
            FlagScope::User(user),
            json!({"flags": {"savedRestaurants": false}}),
        );

        assert!(cache.get(&resolver, Some(user)).await.get(FeatureFlag::SavedRestaurants));
        assert!(!resolver.is_enabled(FeatureFlag::SavedRestaurants, Some(user)).await);
        assert!(resolver.is_enabled(FeatureFlag::SavedRestaurants, None).await);
    }

    #[tokio::test]
    async fn test_is_enabled_falls_back_when_store_fails() {
        let user = UserId::generate();
        let resolver = FlagResolver::new(FakeSource {
            failing: vec![FlagScope::Global, FlagScope::User(user)],
            ..FakeSource::default()
        });
        let default = FeatureFlags::defaults().get(FeatureFlag::SavedRestaurants);
        assert_eq!(
            resolver.is_enabled(FeatureFlag::SavedRestaurants, Some(user)).await,
            default
        );
    }

    #[tokio::test]
    async fn test_refresh_on_empty_cache_is_unchanged() {
        let resolver = FlagResolver::new(FakeSource::default());
        let cache = FlagCache::new(FLAG_CACHE_TTL);
        assert!(!cache.refresh(&resolver, None).await.changed);
    }
}
