//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::catalog::CatalogService;
use crate::services::realtime::RealtimeClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogService,
    realtime: RealtimeClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The real-time client is disabled when the config has no relay.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let realtime = RealtimeClient::new(config.realtime.as_ref());
        Self::with_realtime(config, pool, realtime)
    }

    /// Create application state with an explicit real-time client.
    #[must_use]
    pub fn with_realtime(config: StorefrontConfig, pool: PgPool, realtime: RealtimeClient) -> Self {
        let catalog = CatalogService::new(pool.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                realtime,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the cached catalog reader.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the real-time notification client.
    #[must_use]
    pub fn realtime(&self) -> &RealtimeClient {
        &self.inner.realtime
    }
}
