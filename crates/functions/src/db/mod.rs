//! Database operations for functions `PostgreSQL`.
//!
//! # Database: `wildcurrant_functions` (SEPARATE from storefront)
//!
//! ## Tables
//!
//! - `functions.user_roles` - Role grants keyed by auth backend account id
//! - `functions.image_renditions` - Background-removal result cache (keyed by source URL)
//! - `functions.recipes` - Generated serving recipes (JSONB content)
//! - `functions.blog_imports` - Blog import result cache (keyed by source URL)
//! - `functions.blog_posts` - Imported blog posts
//! - `functions.wholesale_applications` - Wholesale account applications
//! - `functions.wholesale_customers` - Approved wholesale roster (synced to commerce)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/functions/migrations/` and run via:
//! ```bash
//! cargo run -p wildcurrant-cli -- migrate functions
//! ```

pub mod blog;
pub mod image_renditions;
pub mod recipes;
pub mod roles;
pub mod wholesale;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use blog::{BlogImportCache, BlogPostRepository};
pub use image_renditions::ImageRenditionCache;
pub use recipes::RecipeRepository;
pub use roles::RoleRepository;
pub use wholesale::{NewApplication, WholesaleRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate application).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
