//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::{AuthBackendClient, AuthError};
use crate::config::FunctionsConfig;
use crate::db::blog::BlogPost;
use crate::db::recipes::Recipe;
use crate::gateway::GatewayClient;
use crate::services::{ScrapeClient, ScrapeError, StorageClient, StorageError};

/// How long public read caches serve a stale listing at most. Writes
/// invalidate eagerly; the TTL only covers out-of-band database edits.
const READ_CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors from constructing the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: FunctionsConfig,
    pool: PgPool,
    gateway: GatewayClient,
    auth: AuthBackendClient,
    scrape: ScrapeClient,
    storage: StorageClient,
    /// Cached blog listing, invalidated on import.
    blog_cache: Cache<(), Arc<Vec<BlogPost>>>,
    /// Cached completed-recipe listings by product, invalidated on generation.
    recipe_cache: Cache<String, Arc<Vec<Recipe>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Functions service configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if any outbound client cannot be constructed from
    /// the configured credentials.
    pub fn new(config: FunctionsConfig, pool: PgPool) -> Result<Self, StateError> {
        let gateway = GatewayClient::new(&config.gateway);
        let auth = AuthBackendClient::new(&config.auth)?;
        let scrape = ScrapeClient::new(&config.scrape)?;
        let storage = StorageClient::new(&config.storage)?;

        let blog_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(READ_CACHE_TTL)
            .build();
        let recipe_cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(READ_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
                auth,
                scrape,
                storage,
                blog_cache,
                recipe_cache,
            }),
        })
    }

    /// Get a reference to the functions configuration.
    #[must_use]
    pub fn config(&self) -> &FunctionsConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the AI gateway client.
    #[must_use]
    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    /// Get a reference to the auth backend client.
    #[must_use]
    pub fn auth(&self) -> &AuthBackendClient {
        &self.inner.auth
    }

    /// Get a reference to the scrape client.
    #[must_use]
    pub fn scrape(&self) -> &ScrapeClient {
        &self.inner.scrape
    }

    /// Get a reference to the object storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get a reference to the blog listing cache.
    #[must_use]
    pub fn blog_cache(&self) -> &Cache<(), Arc<Vec<BlogPost>>> {
        &self.inner.blog_cache
    }

    /// Get a reference to the per-product recipe listing cache.
    #[must_use]
    pub fn recipe_cache(&self) -> &Cache<String, Arc<Vec<Recipe>>> {
        &self.inner.recipe_cache
    }
}
