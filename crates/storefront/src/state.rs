//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::commerce::CommerceClient;
use crate::config::StorefrontConfig;
use crate::services::{MarketingClient, MarketingError};

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
    commerce: CommerceClient,
    marketing: MarketingClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool (sessions only)
    ///
    /// # Errors
    ///
    /// Returns an error if the mailing list client cannot be constructed
    /// from the configured credentials.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, MarketingError> {
        let commerce = CommerceClient::new(&config.commerce);
        let marketing = MarketingClient::new(&config.marketing)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                commerce,
                marketing,
            }),
        })
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

    /// Get a reference to the commerce platform cart client.
    #[must_use]
    pub fn commerce(&self) -> &CommerceClient {
        &self.inner.commerce
    }

    /// Get a reference to the mailing list client.
    #[must_use]
    pub fn marketing(&self) -> &MarketingClient {
        &self.inner.marketing
    }
}
