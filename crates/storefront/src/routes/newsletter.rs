//! Newsletter signup.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use wildcurrant_core::types::Email;

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Subscribe an address to the mailing list.
///
/// POST /api/newsletter
///
/// Already-subscribed addresses are reported as success so the form never
/// leaks whether an address is on the list.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&request.email).map_err(|e| AppError::Validation {
        field: "email",
        message: e.to_string(),
    })?;

    state.marketing().subscribe_email(&email).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Thanks for subscribing! Check your inbox to confirm." })),
    ))
}
