//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::BocadoConfig;
use crate::services::flags::{FLAG_CACHE_TTL, FlagCache};
use crate::services::pantry::PantrySessions;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BocadoConfig,
    pool: PgPool,
    flag_cache: FlagCache,
    pantry_sessions: PantrySessions,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: BocadoConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                flag_cache: FlagCache::new(FLAG_CACHE_TTL),
                pantry_sessions: PantrySessions::default(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &BocadoConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Resolved flag maps, cached per user.
    #[must_use]
    pub fn flag_cache(&self) -> &FlagCache {
        &self.inner.flag_cache
    }

    /// In-memory pantry models of signed-in users.
    #[must_use]
    pub fn pantry_sessions(&self) -> &PantrySessions {
        &self.inner.pantry_sessions
    }
}
