//! Generated serving recipes.
//!
//! One recipe per `(product_id, occasion)` pair, generated at most once:
//! generation runs under [`OnExisting::Skip`], so even a failed attempt
//! blocks the pair until an operator clears it with the CLI. Recipe bodies
//! are stored as JSONB and validated on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;
use crate::resolve::{ClaimOutcome, OnExisting, ResultCache};

/// Cache key for recipe generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeKey {
    pub product_id: String,
    pub occasion: String,
}

impl RecipeKey {
    /// Build a key with the occasion normalized.
    ///
    /// Occasions are stored trimmed and lowercased, so "Dinner" and
    /// "dinner" name one cache row.
    #[must_use]
    pub fn new(product_id: &str, occasion: &str) -> Self {
        Self {
            product_id: product_id.trim().to_string(),
            occasion: occasion.trim().to_lowercase(),
        }
    }
}

/// The generated recipe body, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeContent {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garnish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glassware: Option<String>,
}

/// A completed recipe as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub product_id: String,
    pub occasion: String,
    pub recipe: RecipeContent,
    pub created_at: DateTime<Utc>,
}

/// Database row for the `recipes` table.
#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    id: Uuid,
    product_id: String,
    occasion: String,
    status: String,
    recipe: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = RepositoryError;

    fn try_from(row: RecipeRow) -> Result<Self, Self::Error> {
        let recipe = row.recipe.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("recipe {} has no body", row.id))
        })?;
        let recipe: RecipeContent = serde_json::from_value(recipe).map_err(|e| {
            RepositoryError::DataCorruption(format!("recipe {} body invalid: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            occasion: row.occasion,
            recipe,
            created_at: row.created_at,
        })
    }
}

/// Repository for recipe reads and the generation cache.
pub struct RecipeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecipeRepository<'a> {
    /// Create a new repository backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Completed recipes for one product, ordered by occasion.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored body is invalid.
    pub async fn list_completed_for_product(
        &self,
        product_id: &str,
    ) -> Result<Vec<Recipe>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r"
            SELECT id, product_id, occasion, status, recipe, created_at
            FROM functions.recipes
            WHERE product_id = $1 AND status = 'completed'
            ORDER BY occasion
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Delete one recipe row so the pair can be generated again.
    ///
    /// Removes the row in any state, failed attempts included. The occasion
    /// is normalized the same way generation normalizes it. Returns whether
    /// a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear(&self, product_id: &str, occasion: &str) -> Result<bool, RepositoryError> {
        let key = RecipeKey::new(product_id, occasion);
        let result =
            sqlx::query("DELETE FROM functions.recipes WHERE product_id = $1 AND occasion = $2")
                .bind(&key.product_id)
                .bind(&key.occasion)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl ResultCache for RecipeRepository<'_> {
    type Key = RecipeKey;
    type Draft = RecipeContent;
    type Stored = Recipe;

    async fn claim(
        &self,
        key: &RecipeKey,
        policy: OnExisting,
    ) -> Result<ClaimOutcome<Recipe>, RepositoryError> {
        let claimed = match policy {
            OnExisting::RetryFailed => {
                sqlx::query(
                    r"
                    INSERT INTO functions.recipes (product_id, occasion, status)
                    VALUES ($1, $2, 'processing')
                    ON CONFLICT (product_id, occasion) DO UPDATE
                        SET status = 'processing', error = NULL, updated_at = now()
                        WHERE recipes.status = 'failed'
                    ",
                )
                .bind(&key.product_id)
                .bind(&key.occasion)
                .execute(self.pool)
                .await?
                .rows_affected()
                    == 1
            }
            OnExisting::Skip => {
                sqlx::query(
                    r"
                    INSERT INTO functions.recipes (product_id, occasion, status)
                    VALUES ($1, $2, 'processing')
                    ON CONFLICT (product_id, occasion) DO NOTHING
                    ",
                )
                .bind(&key.product_id)
                .bind(&key.occasion)
                .execute(self.pool)
                .await?
                .rows_affected()
                    == 1
            }
        };

        if claimed {
            return Ok(ClaimOutcome::Claimed);
        }

        let row = sqlx::query_as::<_, RecipeRow>(
            r"
            SELECT id, product_id, occasion, status, recipe, created_at
            FROM functions.recipes
            WHERE product_id = $1 AND occasion = $2
            ",
        )
        .bind(&key.product_id)
        .bind(&key.occasion)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            // Recipes are only deleted by an explicit operator clear; a
            // concurrent clear just means the next call will reclaim.
            return Ok(ClaimOutcome::InFlight);
        };

        match row.status.as_str() {
            "completed" => Ok(ClaimOutcome::Completed(row.try_into()?)),
            "processing" => Ok(ClaimOutcome::InFlight),
            "failed" => match policy {
                OnExisting::RetryFailed => Ok(ClaimOutcome::InFlight),
                OnExisting::Skip => Ok(ClaimOutcome::Skipped),
            },
            other => Err(RepositoryError::DataCorruption(format!(
                "unknown recipe status: {other}"
            ))),
        }
    }

    async fn complete(
        &self,
        key: &RecipeKey,
        draft: RecipeContent,
    ) -> Result<Recipe, RepositoryError> {
        let body = serde_json::to_value(&draft).map_err(|e| {
            RepositoryError::DataCorruption(format!("recipe body not serializable: {e}"))
        })?;

        let row = sqlx::query_as::<_, RecipeRow>(
            r"
            UPDATE functions.recipes
            SET status = 'completed', recipe = $3, error = NULL, updated_at = now()
            WHERE product_id = $1 AND occasion = $2
            RETURNING id, product_id, occasion, status, recipe, created_at
            ",
        )
        .bind(&key.product_id)
        .bind(&key.occasion)
        .bind(body)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn fail(&self, key: &RecipeKey, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE functions.recipes
            SET status = 'failed', error = $3, updated_at = now()
            WHERE product_id = $1 AND occasion = $2
            ",
        )
        .bind(&key.product_id)
        .bind(&key.occasion)
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
