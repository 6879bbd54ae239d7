//! Image background-removal route handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::resolve::{Resolution, ResolveError};
use crate::services::ImageService;
use crate::state::AppState;

/// Request body for a background-removal.
#[derive(Debug, Deserialize)]
pub struct RemoveBackgroundRequest {
    pub source_url: String,
}

/// Remove the background from a product image, or serve the cached rendition.
///
/// POST /api/images/remove-background
///
/// Returns 200 with `{"url", "cached"}` when a rendition is available and
/// 202 `{"status": "processing"}` when another request is already working
/// on the same source URL.
#[instrument(skip(state, request), fields(source_url = %request.source_url))]
pub async fn remove_background(
    State(state): State<AppState>,
    Json(request): Json<RemoveBackgroundRequest>,
) -> Result<Response> {
    let source_url = request.source_url.trim();
    if source_url.is_empty() {
        return Err(AppError::Validation {
            field: "source_url",
            message: "Source URL is required.".to_string(),
        });
    }

    let service = ImageService::new(
        state.pool(),
        state.gateway(),
        state.scrape(),
        state.storage(),
    );

    match service.resolve_rendition(source_url).await {
        Ok(Resolution::Fresh(url)) => {
            Ok(Json(json!({ "url": url, "cached": false })).into_response())
        }
        Ok(Resolution::Cached(url)) => {
            Ok(Json(json!({ "url": url, "cached": true })).into_response())
        }
        Ok(Resolution::InFlight | Resolution::Skipped) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "processing" })),
        )
            .into_response()),
        Err(ResolveError::Cache(error)) => Err(AppError::Repository(error)),
        Err(ResolveError::Generation(error)) => Err(AppError::Image(error)),
    }
}
