//! Wholesale applications and the active-customer roster.
//!
//! Applications arrive from the public storefront form and sit in `pending`
//! until an operator approves or rejects them. A sync pass materializes
//! approved, not-yet-synced applications into `wholesale_customers`, which
//! is what the public "is this email an active wholesale buyer" check reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Lifecycle of a wholesale application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wholesale account application.
#[derive(Debug, Clone, Serialize)]
pub struct WholesaleApplication {
    pub id: Uuid,
    pub business_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    /// Set once the approval has been materialized into the roster.
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields collected by the public application form.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub business_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// An active (or deactivated) wholesale buyer.
#[derive(Debug, Clone, Serialize)]
pub struct WholesaleCustomer {
    pub id: Uuid,
    pub email: String,
    pub business_name: String,
    pub active: bool,
    pub application_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Database row for the `wholesale_applications` table.
#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    business_name: String,
    contact_name: String,
    email: String,
    phone: Option<String>,
    message: Option<String>,
    status: String,
    synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for WholesaleApplication {
    type Error = RepositoryError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status = ApplicationStatus::parse(&row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown application status: {}", row.status))
        })?;

        Ok(Self {
            id: row.id,
            business_name: row.business_name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            status,
            synced_at: row.synced_at,
            created_at: row.created_at,
        })
    }
}

/// Database row for the `wholesale_customers` table.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    email: String,
    business_name: String,
    active: bool,
    application_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for WholesaleCustomer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            business_name: row.business_name,
            active: row.active,
            application_id: row.application_id,
            created_at: row.created_at,
        }
    }
}

const APPLICATION_COLUMNS: &str =
    "id, business_name, contact_name, email, phone, message, status, synced_at, created_at";

const CUSTOMER_COLUMNS: &str = "id, email, business_name, active, application_id, created_at";

/// Repository for wholesale applications and customers.
pub struct WholesaleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WholesaleRepository<'a> {
    /// Create a new repository backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a new application.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if this email already applied.
    pub async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<WholesaleApplication, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r"
            INSERT INTO functions.wholesale_applications
                (business_name, contact_name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {APPLICATION_COLUMNS}
            "
        ))
        .bind(&application.business_name)
        .bind(&application.contact_name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.message)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                "an application for this email already exists".to_string(),
            ),
            _ => RepositoryError::Database(e),
        })?;

        row.try_into()
    }

    /// Applications, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is invalid.
    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<WholesaleApplication>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ApplicationRow>(&format!(
                    r"
                    SELECT {APPLICATION_COLUMNS}
                    FROM functions.wholesale_applications
                    WHERE status = $1
                    ORDER BY created_at DESC
                    "
                ))
                .bind(status.as_str())
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ApplicationRow>(&format!(
                    r"
                    SELECT {APPLICATION_COLUMNS}
                    FROM functions.wholesale_applications
                    ORDER BY created_at DESC
                    "
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Look up one application.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the id is unknown.
    pub async fn get_application(&self, id: Uuid) -> Result<WholesaleApplication, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM functions.wholesale_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Record a review decision. Only pending applications can be reviewed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] for an unknown id and
    /// [`RepositoryError::Conflict`] if the application was already reviewed.
    pub async fn set_status(
        &self,
        id: Uuid,
        decision: ApplicationStatus,
    ) -> Result<WholesaleApplication, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r"
            UPDATE functions.wholesale_applications
            SET status = $2, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING {APPLICATION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(decision.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            // Distinguish "no such application" from "already reviewed".
            None => {
                let existing = self.get_application(id).await?;
                Err(RepositoryError::Conflict(format!(
                    "application already {}",
                    existing.status
                )))
            }
        }
    }

    /// Materialize approved, unsynced applications into the customer roster.
    ///
    /// Idempotent: an email already in the roster is reactivated rather than
    /// duplicated. Returns how many applications were synced.
    ///
    /// # Errors
    ///
    /// Returns an error if either statement fails; nothing is synced then.
    pub async fn sync_approved(&self) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO functions.wholesale_customers
                (email, business_name, active, application_id)
            SELECT email, business_name, TRUE, id
            FROM functions.wholesale_applications
            WHERE status = 'approved' AND synced_at IS NULL
            ON CONFLICT (email) DO UPDATE
                SET active = TRUE,
                    business_name = EXCLUDED.business_name,
                    application_id = EXCLUDED.application_id,
                    updated_at = now()
            ",
        )
        .execute(&mut *tx)
        .await?;

        let synced = sqlx::query(
            r"
            UPDATE functions.wholesale_applications
            SET synced_at = now(), updated_at = now()
            WHERE status = 'approved' AND synced_at IS NULL
            ",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(synced)
    }

    /// Whether `email` belongs to an active wholesale buyer.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn is_active_customer(&self, email: &str) -> Result<bool, RepositoryError> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM functions.wholesale_customers WHERE email = $1 AND active)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(active)
    }

    /// The full customer roster, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_customers(&self) -> Result<Vec<WholesaleCustomer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM functions.wholesale_customers
            ORDER BY created_at DESC
            "
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
