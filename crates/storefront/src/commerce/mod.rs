//! Commerce platform cart API client.
//!
//! # Architecture
//!
//! - Hand-written GraphQL documents sent over plain HTTP POST
//! - The commerce platform is source of truth - NO local sync, direct API calls
//! - Every cart mutation returns the full cart, which callers store verbatim
//!
//! # Example
//!
//! ```rust,ignore
//! use wildcurrant_storefront::commerce::CommerceClient;
//!
//! let client = CommerceClient::new(&config.commerce);
//!
//! // Create a cart with an initial line
//! let cart = client.create_cart(vec![CartLineInput {
//!     merchandise_id: "gid://commerce/ProductVariant/1".to_string(),
//!     quantity: 1,
//! }]).await?;
//!
//! // Add more of something else
//! let cart = client.add_to_cart(&cart.id, vec![CartLineInput {
//!     merchandise_id: "gid://commerce/ProductVariant/2".to_string(),
//!     quantity: 2,
//! }]).await?;
//! ```

mod client;
pub mod queries;
pub mod types;

pub use client::CommerceClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interacting with the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the commerce platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the commerce API.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Source locations in the query.
    #[serde(default)]
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// Build an error carrying only a message, for non-GraphQL failures
    /// reported through the same channel (HTTP status errors, empty payloads).
    pub(crate) fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            // Include message if present
            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            // Include path if present
            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            // Include location if present
            if !e.locations.is_empty() {
                let loc = &e.locations[0];
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commerce_error_display() {
        let err = CommerceError::NotFound("cart-123".to_string());
        assert_eq!(err.to_string(), "Not found: cart-123");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError::message_only("Field not found"),
            GraphQLError::message_only("Invalid ID"),
        ];
        let err = CommerceError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_graphql_error_empty_messages() {
        // Test with empty messages but with path info
        let errors = vec![GraphQLError {
            message: String::new(),
            locations: vec![GraphQLErrorLocation { line: 5, column: 10 }],
            path: vec![
                serde_json::Value::String("cart".to_string()),
                serde_json::Value::Number(0.into()),
            ],
        }];
        let err = CommerceError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: path: cart.0 at line 5:10");
    }

    #[test]
    fn test_graphql_error_no_details() {
        let errors = vec![GraphQLError {
            message: String::new(),
            locations: vec![],
            path: vec![],
        }];
        let err = CommerceError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: [error 1]: (no details)");
    }

    #[test]
    fn test_graphql_error_empty_vec() {
        let err = CommerceError::GraphQL(vec![]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: (no error details provided)"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = CommerceError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_graphql_error_deserializes_with_missing_fields() {
        let err: GraphQLError = serde_json::from_str(r#"{"message": "boom"}"#)
            .expect("minimal error payload should parse");
        assert_eq!(err.message, "boom");
        assert!(err.locations.is_empty());
        assert!(err.path.is_empty());
    }
}
