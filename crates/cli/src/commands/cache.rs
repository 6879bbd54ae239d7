//! Cache row management for generated artifacts.
//!
//! # Usage
//!
//! ```bash
//! # Delete one recipe row so the (product, occasion) pair can be
//! # generated again
//! wcr-cli cache clear-recipe -p lingon-spritz -o "summer solstice"
//! ```
//!
//! # Environment Variables
//!
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string for functions
//!
//! Recipe generation skips any pair that already has a row, including
//! failed ones; deleting the row is the only way to retry a pair.

use sqlx::PgPool;
use thiserror::Error;
use wildcurrant_functions::db::{RecipeRepository, RepositoryError};

/// Errors that can occur during cache management.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Delete the recipe row for one (product, occasion) pair.
///
/// # Errors
///
/// Returns [`CacheError`] if the database operation fails.
pub async fn clear_recipe(product: &str, occasion: &str) -> Result<(), CacheError> {
    let pool = connect().await?;

    let cleared = RecipeRepository::new(&pool).clear(product, occasion).await?;

    if cleared {
        tracing::info!("Cleared recipe row for {} / {}", product, occasion);
    } else {
        tracing::warn!("No recipe row for {} / {}", product, occasion);
    }
    Ok(())
}

async fn connect() -> Result<PgPool, CacheError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FUNCTIONS_DATABASE_URL")
        .map_err(|_| CacheError::MissingEnvVar("FUNCTIONS_DATABASE_URL"))?;

    Ok(PgPool::connect(&database_url).await?)
}
