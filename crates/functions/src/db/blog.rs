//! Blog import cache and imported post storage.
//!
//! Imports are keyed by the exact source URL. A completed import owns one
//! row in `blog_posts`; completion inserts the post and flips the import row
//! in a single transaction, so a crash mid-import leaves the claim in
//! `processing` rather than a half-written post. Post bodies are Markdown;
//! rendering belongs to the consumer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;
use crate::resolve::{ClaimOutcome, OnExisting, ResultCache};

/// A post as scraped and converted, before it has a database identity.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body_markdown: String,
    pub hero_image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// An imported blog post.
#[derive(Debug, Clone, Serialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body_markdown: String,
    pub hero_image_url: Option<String>,
    pub source_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database row for the `blog_posts` table.
#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: Option<String>,
    body_markdown: String,
    hero_image_url: Option<String>,
    source_url: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for BlogPost {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body_markdown: row.body_markdown,
            hero_image_url: row.hero_image_url,
            source_url: row.source_url,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

const POST_COLUMNS: &str = "id, slug, title, excerpt, body_markdown, hero_image_url, \
                            source_url, published_at, created_at";

/// Repository for serving imported posts.
pub struct BlogPostRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogPostRepository<'a> {
    /// Create a new repository backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Imported posts, newest publication first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, limit: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r"
            SELECT {POST_COLUMNS}
            FROM functions.blog_posts
            ORDER BY published_at DESC NULLS LAST, created_at DESC
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Look up one post by slug.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no post has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<BlogPost, RepositoryError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM functions.blog_posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Whether any post already uses this slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM functions.blog_posts WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// Lifecycle state stored alongside each import.
#[derive(Debug, sqlx::FromRow)]
struct ImportStateRow {
    status: String,
    post_id: Option<Uuid>,
}

/// [`ResultCache`] over the `blog_imports` table.
pub struct BlogImportCache<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogImportCache<'a> {
    /// Create a new cache backed by the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn post_by_id(&self, id: Uuid) -> Result<Option<BlogPost>, RepositoryError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM functions.blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

impl ResultCache for BlogImportCache<'_> {
    type Key = str;
    type Draft = PostDraft;
    type Stored = BlogPost;

    async fn claim(
        &self,
        key: &str,
        policy: OnExisting,
    ) -> Result<ClaimOutcome<BlogPost>, RepositoryError> {
        let claimed = match policy {
            OnExisting::RetryFailed => {
                sqlx::query(
                    r"
                    INSERT INTO functions.blog_imports (source_url, status)
                    VALUES ($1, 'processing')
                    ON CONFLICT (source_url) DO UPDATE
                        SET status = 'processing', error = NULL, updated_at = now()
                        WHERE blog_imports.status = 'failed'
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
                    INSERT INTO functions.blog_imports (source_url, status)
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

        let row = sqlx::query_as::<_, ImportStateRow>(
            "SELECT status, post_id FROM functions.blog_imports WHERE source_url = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(ClaimOutcome::InFlight);
        };

        match row.status.as_str() {
            "completed" => {
                let post_id = row.post_id.ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "completed import without post_id: {key}"
                    ))
                })?;
                let post = self.post_by_id(post_id).await?.ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "import references missing post {post_id}"
                    ))
                })?;
                Ok(ClaimOutcome::Completed(post))
            }
            "processing" => Ok(ClaimOutcome::InFlight),
            "failed" => match policy {
                OnExisting::RetryFailed => Ok(ClaimOutcome::InFlight),
                OnExisting::Skip => Ok(ClaimOutcome::Skipped),
            },
            other => Err(RepositoryError::DataCorruption(format!(
                "unknown import status: {other}"
            ))),
        }
    }

    async fn complete(&self, key: &str, draft: PostDraft) -> Result<BlogPost, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r"
            INSERT INTO functions.blog_posts
                (slug, title, excerpt, body_markdown, hero_image_url, source_url, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.excerpt)
        .bind(&draft.body_markdown)
        .bind(&draft.hero_image_url)
        .bind(key)
        .bind(draft.published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!("a post with slug '{}' already exists", draft.slug),
            ),
            _ => RepositoryError::Database(e),
        })?;

        let updated = sqlx::query(
            r"
            UPDATE functions.blog_imports
            SET status = 'completed', post_id = $2, error = NULL, updated_at = now()
            WHERE source_url = $1
            ",
        )
        .bind(key)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(row.into())
    }

    async fn fail(&self, key: &str, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE functions.blog_imports
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
