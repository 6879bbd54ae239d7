//! Error types for the AI gateway client.

use thiserror::Error;

/// Errors that can occur when interacting with the AI gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// Error type from the API.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the gateway.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Gateway credit exhausted or billing problem.
    ///
    /// Distinct from [`GatewayError::RateLimited`]: retrying will not help
    /// until billing is fixed, so callers surface "temporarily unavailable"
    /// rather than "try again shortly".
    #[error("payment required: gateway credit exhausted")]
    PaymentRequired,

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Completion arrived without usable content.
    #[error("no content in completion")]
    MissingContent,
}

/// Error response envelope from the gateway.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::RateLimited(60);
        assert_eq!(err.to_string(), "rate limited, retry after 60 seconds");

        let err = GatewayError::Api {
            error_type: "invalid_request_error".to_string(),
            message: "model not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error (invalid_request_error): model not found"
        );
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "error": {
                "type": "invalid_request_error",
                "message": "max_tokens is too large"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            response.error.error_type.as_deref(),
            Some("invalid_request_error")
        );
        assert_eq!(response.error.message, "max_tokens is too large");
    }

    #[test]
    fn test_api_error_without_type() {
        let json = r#"{ "error": { "message": "something broke" } }"#;
        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert!(response.error.error_type.is_none());
        assert_eq!(response.error.message, "something broke");
    }
}
