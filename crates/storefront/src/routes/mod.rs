//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database ping)
//!
//! # Cart
//! GET    /api/cart              - Current cart view
//! POST   /api/cart/lines        - Add a variant (creates the cart on first add)
//! PATCH  /api/cart/lines        - Set a line's quantity (zero removes it)
//! DELETE /api/cart/lines        - Remove a line
//! GET    /api/cart/checkout     - Redirect to the platform checkout
//!
//! # Newsletter
//! POST /api/newsletter          - Subscribe an email address
//! ```
//!
//! All cart endpoints return the full [`crate::cart::CartView`] so the
//! client can replace its local state wholesale after every call.

pub mod cart;
pub mod newsletter;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route(
            "/lines",
            post(cart::add_line)
                .patch(cart::update_line)
                .delete(cart::remove_line),
        )
        .route("/checkout", get(cart::checkout))
}

/// Create all routes for the storefront API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/api/cart",
            cart_routes().layer(rate_limit::api_rate_limit_layer()),
        )
        .route(
            "/api/newsletter",
            post(newsletter::subscribe).layer(rate_limit::newsletter_rate_limit_layer()),
        )
}
