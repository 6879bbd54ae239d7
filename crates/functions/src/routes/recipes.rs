//! Recipe route handlers.
//!
//! Generation is admin-gated and batch-oriented; listing is public and
//! served through a short-lived in-process cache.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::RecipeRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::RecipeService;
use crate::state::AppState;

/// Most products one generation batch will accept.
const MAX_BATCH_PRODUCTS: usize = 25;

/// Request body for a generation batch.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub occasion: String,
    pub products: Vec<String>,
}

/// Query parameters for the public listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub product_id: String,
}

/// Generate recipes for an occasion across a set of products.
///
/// POST /api/recipes/generate (admin)
///
/// Product/occasion pairs that already have any cache row are skipped,
/// never regenerated. The response reports generated, skipped, and failed
/// buckets; per-product failures do not fail the batch.
#[instrument(skip(state, admin, request), fields(occasion = %request.occasion))]
pub async fn generate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<GenerateRequest>,
) -> Result<impl IntoResponse> {
    let occasion = request.occasion.trim();
    if occasion.is_empty() {
        return Err(AppError::Validation {
            field: "occasion",
            message: "Occasion is required.".to_string(),
        });
    }
    if request.products.is_empty() {
        return Err(AppError::Validation {
            field: "products",
            message: "At least one product is required.".to_string(),
        });
    }
    if request.products.len() > MAX_BATCH_PRODUCTS {
        return Err(AppError::Validation {
            field: "products",
            message: format!("At most {MAX_BATCH_PRODUCTS} products per batch."),
        });
    }
    if request.products.iter().any(|id| id.trim().is_empty()) {
        return Err(AppError::Validation {
            field: "products",
            message: "Product ids must not be blank.".to_string(),
        });
    }

    let service = RecipeService::new(state.pool(), state.gateway());
    let report = service.generate_for_occasion(occasion, &request.products).await?;

    for recipe in &report.generated {
        state.recipe_cache().invalidate(&recipe.product_id).await;
    }

    tracing::info!(
        admin = %admin.email,
        generated = report.generated.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "recipe generation finished"
    );

    Ok(Json(report))
}

/// List completed recipes for a product.
///
/// GET /api/recipes?product_id=
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id.trim();
    if product_id.is_empty() {
        return Err(AppError::Validation {
            field: "product_id",
            message: "Product id is required.".to_string(),
        });
    }

    if let Some(recipes) = state.recipe_cache().get(&product_id.to_string()).await {
        tracing::debug!("Cache hit for recipes");
        return Ok(Json(json!({ "recipes": &*recipes })));
    }

    let recipes = RecipeRepository::new(state.pool())
        .list_completed_for_product(product_id)
        .await?;
    let recipes = Arc::new(recipes);
    state
        .recipe_cache()
        .insert(product_id.to_string(), Arc::clone(&recipes))
        .await;

    Ok(Json(json!({ "recipes": &*recipes })))
}
