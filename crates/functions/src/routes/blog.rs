//! Blog route handlers.
//!
//! Import is admin-gated and idempotent per source URL; reads are public
//! and served through a short-lived in-process cache that import
//! invalidates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::BlogPostRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::resolve::{Resolution, ResolveError};
use crate::services::BlogImportService;
use crate::state::AppState;

/// How many posts the public listing returns.
const LISTING_LIMIT: i64 = 50;

/// Request body for an import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub source_url: String,
}

/// Import an external article as a blog post, or serve the prior import.
///
/// POST /api/blog/import (admin)
///
/// Returns 201 with the post on a fresh import, 200 when the URL was
/// already imported, and 202 `{"status": "processing"}` when another
/// request is mid-import for the same URL.
#[instrument(skip(state, admin, request), fields(source_url = %request.source_url))]
pub async fn import(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<ImportRequest>,
) -> Result<Response> {
    let source_url = request.source_url.trim();
    if source_url.is_empty() {
        return Err(AppError::Validation {
            field: "source_url",
            message: "Source URL is required.".to_string(),
        });
    }

    let service = BlogImportService::new(state.pool(), state.scrape(), state.gateway());

    match service.import(source_url).await {
        Ok(Resolution::Fresh(post)) => {
            state.blog_cache().invalidate(&()).await;
            tracing::info!(admin = %admin.email, slug = %post.slug, "blog post imported");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "post": post, "cached": false })),
            )
                .into_response())
        }
        Ok(Resolution::Cached(post)) => {
            Ok(Json(json!({ "post": post, "cached": true })).into_response())
        }
        Ok(Resolution::InFlight | Resolution::Skipped) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "processing" })),
        )
            .into_response()),
        Err(ResolveError::Cache(error)) => Err(AppError::Repository(error)),
        Err(ResolveError::Generation(error)) => Err(AppError::BlogImport(error)),
    }
}

/// List imported posts, newest first.
///
/// GET /api/blog/posts
#[instrument(skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    if let Some(posts) = state.blog_cache().get(&()).await {
        tracing::debug!("Cache hit for blog posts");
        return Ok(Json(json!({ "posts": &*posts })));
    }

    let posts = BlogPostRepository::new(state.pool()).list(LISTING_LIMIT).await?;
    let posts = Arc::new(posts);
    state.blog_cache().insert((), Arc::clone(&posts)).await;

    Ok(Json(json!({ "posts": &*posts })))
}

/// Fetch a single post by slug.
///
/// GET /api/blog/posts/{slug}
#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = BlogPostRepository::new(state.pool()).get_by_slug(&slug).await?;
    Ok(Json(post))
}
