//! Role grants backing the management gate.
//!
//! Roles live in this service's own database, keyed by the auth backend's
//! account id. The auth backend proves WHO is calling; this table decides
//! WHAT they may do. Role checks hit the database on every request so a
//! revocation takes effect immediately, not at next login.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Roles this service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full access to management endpoints.
    Admin,
    /// Approved wholesale buyer.
    Wholesale,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Wholesale => "wholesale",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "wholesale" => Some(Self::Wholesale),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A granted role.
#[derive(Debug, Clone)]
pub struct RoleGrant {
    pub account_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Database row for the `user_roles` table.
#[derive(Debug, sqlx::FromRow)]
struct RoleGrantRow {
    account_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoleGrantRow> for RoleGrant {
    type Error = RepositoryError;

    fn try_from(row: RoleGrantRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("unknown role: {}", row.role)))?;
        Ok(Self {
            account_id: row.account_id,
            role,
            created_at: row.created_at,
        })
    }
}

/// Repository for role grants.
pub struct RoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepository<'a> {
    /// Create a new repository backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether `account_id` currently holds `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn has_role(&self, account_id: Uuid, role: Role) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM functions.user_roles WHERE account_id = $1 AND role = $2)",
        )
        .bind(account_id)
        .bind(role.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Grant `role` to `account_id`. Granting an already-held role is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn grant(&self, account_id: Uuid, role: Role) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO functions.user_roles (account_id, role)
            VALUES ($1, $2)
            ON CONFLICT (account_id, role) DO NOTHING
            ",
        )
        .bind(account_id)
        .bind(role.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Revoke `role` from `account_id`. Returns whether a grant was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn revoke(&self, account_id: Uuid, role: Role) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM functions.user_roles WHERE account_id = $1 AND role = $2")
                .bind(account_id)
                .bind(role.as_str())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All grants for one account, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is invalid.
    pub async fn list_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<RoleGrant>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r"
            SELECT account_id, role, created_at
            FROM functions.user_roles
            WHERE account_id = $1
            ORDER BY created_at
            ",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every grant in the system, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is invalid.
    pub async fn list_all(&self) -> Result<Vec<RoleGrant>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r"
            SELECT account_id, role, created_at
            FROM functions.user_roles
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
