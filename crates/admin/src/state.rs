//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::StorageService;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    storage: Option<StorageService>,
}

impl AppState {
    /// Build the state, creating the S3 client when a bucket is configured.
    pub async fn new(config: AdminConfig, pool: PgPool) -> Self {
        let storage = match config.storage.clone() {
            Some(storage) => Some(StorageService::new(storage).await),
            None => {
                tracing::warn!("AWS_S3_BUCKET not set; image uploads are disabled");
                None
            }
        };

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Image storage, if configured.
    #[must_use]
    pub fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }
}
