//! Wholesale application review commands.
//!
//! # Usage
//!
//! ```bash
//! # See what's waiting
//! wcr-cli wholesale list --status pending
//! wcr-cli wholesale show 7c9e4f0a-...
//!
//! # Decide
//! wcr-cli wholesale approve 7c9e4f0a-...
//! wcr-cli wholesale reject 7c9e4f0a-...
//!
//! # Inspect the synced roster
//! wcr-cli wholesale customers
//! ```
//!
//! # Environment Variables
//!
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string for functions
//!
//! Approval only marks the application; the functions service's sync
//! endpoint pushes approved applications into the customer roster.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use wildcurrant_functions::db::RepositoryError;
use wildcurrant_functions::db::wholesale::{ApplicationStatus, WholesaleRepository};

/// Errors that can occur during wholesale review.
#[derive(Debug, Error)]
pub enum WholesaleError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Unknown status filter.
    #[error("Invalid status: {0}. Valid statuses: pending, approved, rejected")]
    InvalidStatus(String),
}

/// List applications, optionally filtered by status.
///
/// # Errors
///
/// Returns [`WholesaleError`] if the filter is unknown or the database
/// operation fails.
pub async fn list(status: Option<&str>) -> Result<(), WholesaleError> {
    let filter = status
        .map(|value| {
            ApplicationStatus::parse(value)
                .ok_or_else(|| WholesaleError::InvalidStatus(value.to_owned()))
        })
        .transpose()?;

    let pool = connect().await?;
    let applications = WholesaleRepository::new(&pool).list_applications(filter).await?;

    for application in &applications {
        tracing::info!(
            "  {}  {:<9} {}  <{}>",
            application.id,
            application.status,
            application.business_name,
            application.email
        );
    }
    tracing::info!("{} application(s)", applications.len());
    Ok(())
}

/// Show one application in full.
///
/// # Errors
///
/// Returns [`WholesaleError`] if the application does not exist or the
/// database operation fails.
pub async fn show(id: Uuid) -> Result<(), WholesaleError> {
    let pool = connect().await?;
    let application = WholesaleRepository::new(&pool).get_application(id).await?;

    tracing::info!("Business:  {}", application.business_name);
    tracing::info!("Contact:   {}", application.contact_name);
    tracing::info!("Email:     {}", application.email);
    tracing::info!("Phone:     {}", application.phone.as_deref().unwrap_or("-"));
    tracing::info!("Status:    {}", application.status);
    tracing::info!("Applied:   {}", application.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(synced_at) = application.synced_at {
        tracing::info!("Synced:    {}", synced_at.format("%Y-%m-%d %H:%M"));
    }
    if let Some(message) = &application.message {
        tracing::info!("Message:   {message}");
    }
    Ok(())
}

/// Approve a pending application.
///
/// # Errors
///
/// Returns [`WholesaleError`] if the application does not exist, was
/// already decided, or the database operation fails.
pub async fn approve(id: Uuid) -> Result<(), WholesaleError> {
    decide(id, ApplicationStatus::Approved).await
}

/// Reject a pending application.
///
/// # Errors
///
/// Returns [`WholesaleError`] if the application does not exist, was
/// already decided, or the database operation fails.
pub async fn reject(id: Uuid) -> Result<(), WholesaleError> {
    decide(id, ApplicationStatus::Rejected).await
}

async fn decide(id: Uuid, decision: ApplicationStatus) -> Result<(), WholesaleError> {
    let pool = connect().await?;
    let application = WholesaleRepository::new(&pool).set_status(id, decision).await?;

    tracing::info!(
        "Marked {} ({}) as {}",
        application.business_name,
        application.email,
        application.status
    );
    if decision == ApplicationStatus::Approved {
        tracing::info!("Run the functions sync endpoint to push approvals to the roster.");
    }
    Ok(())
}

/// List the synced customer roster.
///
/// # Errors
///
/// Returns [`WholesaleError`] if the database operation fails.
pub async fn customers() -> Result<(), WholesaleError> {
    let pool = connect().await?;
    let customers = WholesaleRepository::new(&pool).list_customers().await?;

    for customer in &customers {
        let marker = if customer.active { "active  " } else { "inactive" };
        tracing::info!(
            "  {}  {marker} {}  <{}>",
            customer.id,
            customer.business_name,
            customer.email
        );
    }
    tracing::info!("{} customer(s)", customers.len());
    Ok(())
}

async fn connect() -> Result<PgPool, WholesaleError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FUNCTIONS_DATABASE_URL")
        .map_err(|_| WholesaleError::MissingEnvVar("FUNCTIONS_DATABASE_URL"))?;

    Ok(PgPool::connect(&database_url).await?)
}
