//! Result cache for background-removed product images.
//!
//! Keyed by the exact source image URL. The stored value is the public URL
//! of the processed rendition. Claim atomicity comes from the unique index
//! on `source_url`: the insert-or-retake is a single statement, so two
//! concurrent resolves for the same URL can never both claim.

use sqlx::PgPool;

use super::RepositoryError;
use crate::resolve::{ClaimOutcome, OnExisting, ResultCache};

/// Lifecycle state stored alongside each rendition.
#[derive(Debug, sqlx::FromRow)]
struct RenditionStateRow {
    status: String,
    result_url: Option<String>,
}

/// [`ResultCache`] over the `image_renditions` table.
pub struct ImageRenditionCache<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRenditionCache<'a> {
    /// Create a new cache backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ResultCache for ImageRenditionCache<'_> {
    type Key = str;
    type Draft = String;
    type Stored = String;

    async fn claim(
        &self,
        key: &str,
        policy: OnExisting,
    ) -> Result<ClaimOutcome<String>, RepositoryError> {
        // One statement decides the claim. Under RetryFailed the conflict arm
        // retakes failed rows; under Skip it never touches existing rows.
        let claimed = match policy {
            OnExisting::RetryFailed => {
                sqlx::query(
                    r"
                    INSERT INTO functions.image_renditions (source_url, status)
                    VALUES ($1, 'processing')
                    ON CONFLICT (source_url) DO UPDATE
                        SET status = 'processing', error = NULL, updated_at = now()
                        WHERE image_renditions.status = 'failed'
                    ",
                )
                .bind(key)
                .execute(self.pool)
                .await?
                .rows_affected()
                    == 1
            }
            OnExisting::Skip => {
                sqlx::query(
                    r"
                    INSERT INTO functions.image_renditions (source_url, status)
                    VALUES ($1, 'processing')
                    ON CONFLICT (source_url) DO NOTHING
                    ",
                )
                .bind(key)
                .execute(self.pool)
                .await?
                .rows_affected()
                    == 1
            }
        };

        if claimed {
            return Ok(ClaimOutcome::Claimed);
        }

        let row = sqlx::query_as::<_, RenditionStateRow>(
            "SELECT status, result_url FROM functions.image_renditions WHERE source_url = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            // The blocking row vanished between the insert and this read.
            // Nothing deletes renditions, so this is effectively unreachable;
            // reporting in-flight makes the caller retry and reclaim.
            return Ok(ClaimOutcome::InFlight);
        };

        match row.status.as_str() {
            "completed" => {
                let url = row.result_url.ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "completed rendition without result_url: {key}"
                    ))
                })?;
                Ok(ClaimOutcome::Completed(url))
            }
            "processing" => Ok(ClaimOutcome::InFlight),
            "failed" => match policy {
                // Another request retook the row after our statement ran.
                OnExisting::RetryFailed => Ok(ClaimOutcome::InFlight),
                OnExisting::Skip => Ok(ClaimOutcome::Skipped),
            },
            other => Err(RepositoryError::DataCorruption(format!(
                "unknown rendition status: {other}"
            ))),
        }
    }

    async fn complete(&self, key: &str, draft: String) -> Result<String, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE functions.image_renditions
            SET status = 'completed', result_url = $2, error = NULL, updated_at = now()
            WHERE source_url = $1
            ",
        )
        .bind(key)
        .bind(&draft)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(draft)
    }

    async fn fail(&self, key: &str, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE functions.image_renditions
            SET status = 'failed', error = $2, updated_at = now()
            WHERE source_url = $1
            ",
        )
        .bind(key)
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
