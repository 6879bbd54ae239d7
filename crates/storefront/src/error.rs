//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cart::CartError;
use crate::commerce::CommerceError;
use crate::services::MarketingError;

/// Application-level error type for the storefront API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Newsletter subscription failed.
    #[error("Marketing error: {0}")]
    Marketing(#[from] MarketingError),

    /// Request body failed validation.
    #[error("Validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error indicates a fault on our side worth reporting.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Internal(_) | Self::Marketing(_) => true,
            Self::Cart(CartError::Session(_)) => true,
            Self::Cart(CartError::Api(err)) => !matches!(
                err,
                CommerceError::RateLimited(_) | CommerceError::UserError(_)
            ),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Cart(err) => match err {
                CartError::NoActiveCart => StatusCode::NOT_FOUND,
                CartError::Api(CommerceError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
                CartError::Api(CommerceError::UserError(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::Api(_) => StatusCode::BAD_GATEWAY,
                CartError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Marketing(_) => StatusCode::BAD_GATEWAY,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Cart(err) => match err {
                CartError::NoActiveCart => "No active cart".to_string(),
                CartError::Api(CommerceError::RateLimited(_)) => {
                    "Too many requests. Please try again shortly.".to_string()
                }
                // User errors come from the platform's shopper-facing surface
                CartError::Api(CommerceError::UserError(msg)) => msg.clone(),
                CartError::Api(_) => "Couldn't update your cart. Please try again.".to_string(),
                CartError::Session(_) => "Internal server error".to_string(),
            },
            Self::Marketing(_) => {
                "Subscription is temporarily unavailable. Please try again.".to_string()
            }
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        };

        let body = match &self {
            Self::Validation { field, .. } => json!({ "error": message, "field": field }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
