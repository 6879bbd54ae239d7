//! Unified error handling for the functions service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::gateway::GatewayError;
use crate::services::assistant::AssistantError;
use crate::services::blog_import::BlogImportError;
use crate::services::images::ImageError;
use crate::services::scrape::ScrapeError;

/// Application-wide error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Blog import error: {0}")]
    BlogImport(#[from] BlogImportError),

    #[error("Validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error indicates a fault on our side (or in an upstream
    /// dependency we operate) rather than a problem with the request.
    /// Server faults are reported to Sentry; client errors are not.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Repository(err) => matches!(
                err,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            Self::Gateway(err) => gateway_is_server_fault(err),
            Self::Assistant(err) => match err {
                AssistantError::Gateway(inner) => gateway_is_server_fault(inner),
                AssistantError::UnknownPersona(_) | AssistantError::InvalidConversation(_) => false,
            },
            Self::Image(err) => match err {
                ImageError::Gateway(inner) => gateway_is_server_fault(inner),
                ImageError::Storage(_) => true,
                ImageError::Download(_) => false,
            },
            Self::BlogImport(err) => match err {
                BlogImportError::Gateway(inner) => gateway_is_server_fault(inner),
                BlogImportError::Repository(_) | BlogImportError::Convert(_) => true,
                BlogImportError::Fetch(_) | BlogImportError::Extract(_) => false,
            },
            Self::Validation { .. } | Self::NotFound(_) | Self::BadRequest(_) => false,
            Self::Internal(_) => true,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Gateway(err) => gateway_status(err),
            Self::Assistant(err) => match err {
                AssistantError::Gateway(inner) => gateway_status(inner),
                AssistantError::UnknownPersona(_) | AssistantError::InvalidConversation(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
            Self::Image(err) => match err {
                ImageError::Gateway(inner) => gateway_status(inner),
                ImageError::Download(inner) => scrape_status(inner),
                ImageError::Storage(_) => StatusCode::BAD_GATEWAY,
            },
            Self::BlogImport(err) => match err {
                BlogImportError::Gateway(inner) => gateway_status(inner),
                BlogImportError::Fetch(inner) => scrape_status(inner),
                BlogImportError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BlogImportError::Convert(_) => StatusCode::BAD_GATEWAY,
                BlogImportError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never leaks internal details for server faults.
    fn message(&self) -> String {
        match self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Conflict(message) => message.clone(),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Gateway(err) => gateway_message(err),
            Self::Assistant(err) => match err {
                AssistantError::Gateway(inner) => gateway_message(inner),
                AssistantError::UnknownPersona(_) | AssistantError::InvalidConversation(_) => {
                    err.to_string()
                }
            },
            Self::Image(err) => match err {
                ImageError::Gateway(inner) => gateway_message(inner),
                ImageError::Download(inner) => scrape_message(inner),
                ImageError::Storage(_) => {
                    "Could not store the processed image. Please try again.".to_string()
                }
            },
            Self::BlogImport(err) => match err {
                BlogImportError::Gateway(inner) => gateway_message(inner),
                BlogImportError::Fetch(inner) => scrape_message(inner),
                BlogImportError::Extract(reason) => reason.clone(),
                BlogImportError::Convert(_) => {
                    "Could not convert the article. Please try again.".to_string()
                }
                BlogImportError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound(message) | Self::BadRequest(message) => message.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

const fn gateway_is_server_fault(err: &GatewayError) -> bool {
    // Rate limiting is expected backpressure. Everything else, including
    // exhausted credits, needs an operator to look at it.
    !matches!(err, GatewayError::RateLimited(_))
}

const fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::PaymentRequired => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Http(_)
        | GatewayError::Api { .. }
        | GatewayError::Unauthorized(_)
        | GatewayError::Parse(_)
        | GatewayError::Stream(_)
        | GatewayError::MissingContent => StatusCode::BAD_GATEWAY,
    }
}

fn gateway_message(err: &GatewayError) -> String {
    match err {
        GatewayError::RateLimited(_) => {
            "The assistant is handling a lot of requests right now. Please try again shortly."
                .to_string()
        }
        GatewayError::PaymentRequired => "This feature is temporarily unavailable.".to_string(),
        GatewayError::Http(_)
        | GatewayError::Api { .. }
        | GatewayError::Unauthorized(_)
        | GatewayError::Parse(_)
        | GatewayError::Stream(_)
        | GatewayError::MissingContent => "Upstream service error. Please try again.".to_string(),
    }
}

const fn scrape_status(err: &ScrapeError) -> StatusCode {
    match err {
        ScrapeError::InvalidUrl(_) | ScrapeError::DisallowedHost(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScrapeError::Http(_) | ScrapeError::Status(_) | ScrapeError::TooLarge { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn scrape_message(err: &ScrapeError) -> String {
    match err {
        ScrapeError::InvalidUrl(_) | ScrapeError::DisallowedHost(_) => err.to_string(),
        ScrapeError::Http(_) | ScrapeError::Status(_) | ScrapeError::TooLarge { .. } => {
            "Could not fetch the source URL. Check that it is reachable and try again.".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            tracing::error!(error = %self, "request failed");
            sentry::capture_error(&self);
        }

        let status = self.status();
        let body = match &self {
            Self::Validation { field, .. } => json!({
                "error": self.message(),
                "field": field,
            }),
            _ => json!({ "error": self.message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience alias for handler results.
pub type Result<T> = std::result::Result<T, AppError>;
