//! Role grant management for the functions admin gate.
//!
//! # Usage
//!
//! ```bash
//! # Grant the admin role to an auth backend account
//! wcr-cli roles grant -a 7c9e4f0a-... -r admin
//!
//! # Revoke it again
//! wcr-cli roles revoke -a 7c9e4f0a-... -r admin
//!
//! # List every grant, or one account's grants
//! wcr-cli roles list
//! wcr-cli roles list -a 7c9e4f0a-...
//! ```
//!
//! # Environment Variables
//!
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string for functions
//!
//! The account id is the auth backend's id for the user; the functions
//! service never stores its own users.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use wildcurrant_functions::db::RepositoryError;
use wildcurrant_functions::db::roles::{Role, RoleRepository};

/// Errors that can occur during role management.
#[derive(Debug, Error)]
pub enum RolesError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Unknown role name.
    #[error("Invalid role: {0}. Valid roles: admin, wholesale")]
    InvalidRole(String),
}

/// Grant `role` to `account`. Granting an already-held role is a no-op.
///
/// # Errors
///
/// Returns [`RolesError`] if the role name is unknown or the database
/// operation fails.
pub async fn grant(account: Uuid, role: &str) -> Result<(), RolesError> {
    let role = parse_role(role)?;
    let pool = connect().await?;

    RoleRepository::new(&pool).grant(account, role).await?;

    tracing::info!("Granted {} to {}", role, account);
    Ok(())
}

/// Revoke `role` from `account`.
///
/// # Errors
///
/// Returns [`RolesError`] if the role name is unknown or the database
/// operation fails.
pub async fn revoke(account: Uuid, role: &str) -> Result<(), RolesError> {
    let role = parse_role(role)?;
    let pool = connect().await?;

    let removed = RoleRepository::new(&pool).revoke(account, role).await?;

    if removed {
        tracing::info!("Revoked {} from {}", role, account);
    } else {
        tracing::warn!("{} did not hold {}", account, role);
    }
    Ok(())
}

/// List grants, for one account or for everyone.
///
/// # Errors
///
/// Returns [`RolesError`] if the database operation fails.
pub async fn list(account: Option<Uuid>) -> Result<(), RolesError> {
    let pool = connect().await?;
    let repository = RoleRepository::new(&pool);

    let grants = match account {
        Some(account) => repository.list_for_account(account).await?,
        None => repository.list_all().await?,
    };

    for grant in &grants {
        tracing::info!(
            "  {}  {}  granted {}",
            grant.account_id,
            grant.role,
            grant.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    tracing::info!("{} grant(s)", grants.len());
    Ok(())
}

fn parse_role(role: &str) -> Result<Role, RolesError> {
    Role::parse(role).ok_or_else(|| RolesError::InvalidRole(role.to_owned()))
}

async fn connect() -> Result<PgPool, RolesError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FUNCTIONS_DATABASE_URL")
        .map_err(|_| RolesError::MissingEnvVar("FUNCTIONS_DATABASE_URL"))?;

    Ok(PgPool::connect(&database_url).await?)
}
