//! Cart route handlers.
//!
//! Thin JSON wrappers over [`CartStore`]: each request builds a store from the
//! shared commerce client and the visitor's session, loads the referenced
//! cart, applies at most one mutation, and returns the refreshed view.
//!
//! A store instance lives for one request. Serialization of truly concurrent
//! requests for the same visitor is left to the commerce platform, which
//! serializes writes to a single cart id; the store's own mutation queue
//! covers overlapping calls within a request and in tests.

use axum::response::Redirect;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::{CartStore, SessionCartIds};
use crate::commerce::CommerceClient;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Request body for adding a line.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub variant_id: String,
    pub quantity: Option<i64>,
}

/// Request body for updating a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub line_id: String,
    pub quantity: i64,
}

/// Request body for removing a line.
#[derive(Debug, Deserialize)]
pub struct RemoveLineRequest {
    pub line_id: String,
}

/// Build a cart store for this request's session.
fn store_for(state: &AppState, session: Session) -> CartStore<CommerceClient, SessionCartIds> {
    CartStore::new(state.commerce().clone(), SessionCartIds::new(session))
}

/// Current cart view.
///
/// GET /api/cart
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let store = store_for(&state, session);
    store.load().await;
    Json(store.snapshot().await)
}

/// Add a variant to the cart, creating the cart on first add.
///
/// POST /api/cart/lines
#[instrument(skip(state, session), fields(variant_id = %request.variant_id))]
pub async fn add_line(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddLineRequest>,
) -> Result<impl IntoResponse> {
    let quantity = request.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::Validation {
            field: "quantity",
            message: "Quantity must be at least 1.".to_string(),
        });
    }

    let store = store_for(&state, session);
    store.load().await;
    store.add_line(&request.variant_id, quantity).await?;
    Ok(Json(store.snapshot().await))
}

/// Set a line's quantity. Zero or negative removes the line.
///
/// PATCH /api/cart/lines
#[instrument(skip(state, session), fields(line_id = %request.line_id))]
pub async fn update_line(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateLineRequest>,
) -> Result<impl IntoResponse> {
    let store = store_for(&state, session);
    store.load().await;
    store
        .update_line_quantity(&request.line_id, request.quantity)
        .await?;
    Ok(Json(store.snapshot().await))
}

/// Remove a line from the cart.
///
/// DELETE /api/cart/lines
#[instrument(skip(state, session), fields(line_id = %request.line_id))]
pub async fn remove_line(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveLineRequest>,
) -> Result<impl IntoResponse> {
    let store = store_for(&state, session);
    store.load().await;
    store.remove_line(&request.line_id).await?;
    Ok(Json(store.snapshot().await))
}

/// Hand the shopper off to the platform's checkout.
///
/// GET /api/cart/checkout
///
/// The checkout URL is redirected to verbatim, never interpreted.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let store = store_for(&state, session);
    store.load().await;

    let view = store.snapshot().await;
    view.checkout_url
        .as_deref()
        .map(Redirect::to)
        .ok_or_else(|| AppError::NotFound("No active cart to check out".to_string()))
}
