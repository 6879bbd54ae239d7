//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations
//! wcr-cli migrate storefront
//!
//! # Run functions migrations
//! wcr-cli migrate functions
//!
//! # Run all migrations
//! wcr-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string for functions
//!
//! Migrations are embedded at compile time from each service's
//! `migrations/` directory; neither service runs them on startup.

use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns [`MigrateError`] if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn storefront() -> Result<(), MigrateError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .map_err(|_| MigrateError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Run functions database migrations.
///
/// # Errors
///
/// Returns [`MigrateError`] if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn functions() -> Result<(), MigrateError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FUNCTIONS_DATABASE_URL")
        .map_err(|_| MigrateError::MissingEnvVar("FUNCTIONS_DATABASE_URL"))?;

    tracing::info!("Connecting to functions database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running functions migrations...");
    sqlx::migrate!("../functions/migrations").run(&pool).await?;

    tracing::info!("Functions migrations complete!");
    Ok(())
}
