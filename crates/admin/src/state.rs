//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::audit::AuditLogger;
use crate::services::media::MediaClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    audit: AuditLogger,
    media: Option<MediaClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Media uploads are disabled when the config has no media host.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let media = config.media.as_ref().map(MediaClient::new);
        let audit = AuditLogger::new(pool.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                audit,
                media,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the audit logger.
    #[must_use]
    pub fn audit(&self) -> &AuditLogger {
        &self.inner.audit
    }

    /// Get the media client, if uploads are configured.
    #[must_use]
    pub fn media(&self) -> Option<&MediaClient> {
        self.inner.media.as_ref()
    }
}
