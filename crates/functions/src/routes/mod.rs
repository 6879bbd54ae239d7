//! HTTP route handlers for the functions API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database ping)
//!
//! # Assistant (public, strict rate limit)
//! POST /api/assistant/chat            - Persona chat, SSE stream
//!
//! # Images (public, strict rate limit)
//! POST /api/images/remove-background  - Cached background removal
//!
//! # Recipes
//! POST /api/recipes/generate          - Batch generation (admin)
//! GET  /api/recipes?product_id=       - Completed recipes for a product
//!
//! # Blog
//! POST /api/blog/import               - Import an external article (admin)
//! GET  /api/blog/posts                - Imported posts, newest first
//! GET  /api/blog/posts/{slug}         - Single post
//!
//! # Wholesale
//! POST /api/wholesale/applications    - Submit an application
//! GET  /api/wholesale/status?email=   - Active-customer check
//! POST /api/wholesale/sync            - Push approvals to customers (admin)
//! ```
//!
//! Admin-gated handlers take the [`crate::middleware::RequireAdmin`]
//! extractor; the gate re-checks the role on every call. AI-backed
//! endpoints sit behind the strict rate limiter, everything else behind
//! the relaxed one.

pub mod assistant;
pub mod blog;
pub mod images;
pub mod recipes;
pub mod wholesale;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Create the assistant routes router.
pub fn assistant_routes() -> Router<AppState> {
    Router::new().route("/chat", post(assistant::chat))
}

/// Create the image routes router.
pub fn image_routes() -> Router<AppState> {
    Router::new().route("/remove-background", post(images::remove_background))
}

/// Create the recipe routes router.
pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(recipes::list))
        .route("/generate", post(recipes::generate))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(blog::import))
        .route("/posts", get(blog::list_posts))
        .route("/posts/{slug}", get(blog::get_post))
}

/// Create the wholesale routes router.
pub fn wholesale_routes() -> Router<AppState> {
    Router::new()
        .route("/applications", post(wholesale::apply))
        .route("/status", get(wholesale::status))
        .route("/sync", post(wholesale::sync))
}

/// Create all routes for the functions API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/api/assistant",
            assistant_routes().layer(rate_limit::ai_rate_limit_layer()),
        )
        .nest(
            "/api/images",
            image_routes().layer(rate_limit::ai_rate_limit_layer()),
        )
        .nest(
            "/api/recipes",
            recipe_routes().layer(rate_limit::api_rate_limit_layer()),
        )
        .nest(
            "/api/blog",
            blog_routes().layer(rate_limit::api_rate_limit_layer()),
        )
        .nest(
            "/api/wholesale",
            wholesale_routes().layer(rate_limit::api_rate_limit_layer()),
        )
}
