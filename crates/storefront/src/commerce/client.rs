//! Commerce cart API client implementation.
//!
//! Sends hand-written GraphQL documents with `reqwest` and deserializes
//! responses straight into the domain types in [`super::types`].

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::cart::CartApi;
use crate::commerce::types::{Cart, CartLineInput, CartLineUpdateInput, CartUserError};
use crate::commerce::{CommerceError, GraphQLError, queries};
use crate::config::CommerceConfig;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce platform cart API.
///
/// Cart state is never cached locally; every call goes to the platform so the
/// returned cart is always the authoritative one.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

/// Generic GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// Shared payload shape of every cart mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartMutationPayload {
    cart: Option<Cart>,
    #[serde(default)]
    user_errors: Vec<CartUserError>,
}

#[derive(Debug, Deserialize)]
struct CartCreateData {
    #[serde(rename = "cartCreate")]
    cart_create: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
struct CartQueryData {
    cart: Option<Cart>,
}

#[derive(Debug, Deserialize)]
struct CartLinesAddData {
    #[serde(rename = "cartLinesAdd")]
    cart_lines_add: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
struct CartLinesUpdateData {
    #[serde(rename = "cartLinesUpdate")]
    cart_lines_update: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
struct CartLinesRemoveData {
    #[serde(rename = "cartLinesRemove")]
    cart_lines_remove: Option<CartMutationPayload>,
}

impl CommerceClient {
    /// Create a new cart API client.
    #[must_use]
    pub fn new(config: &CommerceConfig) -> Self {
        Self {
            inner: Arc::new(CommerceClientInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint.clone(),
                api_token: config.api_token.expose_secret().to_string(),
            }),
        }
    }

    /// Execute a GraphQL operation and deserialize its `data` payload.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        variables: serde_json::Value,
    ) -> Result<T, CommerceError> {
        let request_body = serde_json::json!({
            "query": queries::document(operation),
            "variables": variables,
        });

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Static service credential, no per-user identity involved
            .bearer_auth(&self.inner.api_token)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        // Check for non-success status codes
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            return Err(CommerceError::GraphQL(vec![GraphQLError::message_only(
                format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
            )]));
        }

        // Parse the response
        let response: GraphQLResponse<T> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse commerce GraphQL response"
                );
                return Err(CommerceError::Parse(e));
            }
        };

        // Check for GraphQL errors
        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");
            return Err(CommerceError::GraphQL(errors));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %response_text.chars().take(500).collect::<String>(),
                "Commerce GraphQL response has no data and no errors"
            );
            CommerceError::GraphQL(vec![GraphQLError::message_only("No data in response")])
        })
    }
}

/// Unwrap a mutation payload: user errors win, then the cart, then a generic
/// failure naming the attempted action.
fn finish_mutation(
    payload: Option<CartMutationPayload>,
    action: &str,
) -> Result<Cart, CommerceError> {
    if let Some(result) = payload {
        if !result.user_errors.is_empty() {
            return Err(CommerceError::UserError(
                result
                    .user_errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }

        if let Some(cart) = result.cart {
            return Ok(cart);
        }
    }

    Err(CommerceError::GraphQL(vec![GraphQLError::message_only(
        format!("Failed to {action}"),
    )]))
}

impl CartApi for CommerceClient {
    /// Create a new cart, optionally seeded with initial lines.
    #[instrument(skip(self, lines))]
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CommerceError> {
        let variables = serde_json::json!({
            "input": { "lines": lines },
        });

        let data: CartCreateData = self.execute(queries::CART_CREATE, variables).await?;
        finish_mutation(data.cart_create, "create cart")
    }

    /// Fetch a cart by id.
    ///
    /// Returns [`CommerceError::NotFound`] when the platform no longer
    /// recognizes the id (expired or completed carts).
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn get_cart(&self, cart_id: &str) -> Result<Cart, CommerceError> {
        let variables = serde_json::json!({ "cartId": cart_id });

        let data: CartQueryData = self.execute(queries::CART_QUERY, variables).await?;

        data.cart
            .ok_or_else(|| CommerceError::NotFound(format!("Cart not found: {cart_id}")))
    }

    /// Add lines to an existing cart.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    async fn add_to_cart(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CommerceError> {
        let variables = serde_json::json!({
            "cartId": cart_id,
            "lines": lines,
        });

        let data: CartLinesAddData = self.execute(queries::CART_LINES_ADD, variables).await?;
        finish_mutation(data.cart_lines_add, "add to cart")
    }

    /// Update quantities on existing cart lines.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    async fn update_cart_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, CommerceError> {
        let variables = serde_json::json!({
            "cartId": cart_id,
            "lines": lines,
        });

        let data: CartLinesUpdateData = self.execute(queries::CART_LINES_UPDATE, variables).await?;
        finish_mutation(data.cart_lines_update, "update cart lines")
    }

    /// Remove lines from an existing cart.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    async fn remove_from_cart(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> Result<Cart, CommerceError> {
        let variables = serde_json::json!({
            "cartId": cart_id,
            "lineIds": line_ids,
        });

        let data: CartLinesRemoveData = self.execute(queries::CART_LINES_REMOVE, variables).await?;
        finish_mutation(data.cart_lines_remove, "remove from cart")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_json(cart: bool, user_errors: &[&str]) -> CartMutationPayload {
        let errors: Vec<serde_json::Value> = user_errors
            .iter()
            .map(|m| serde_json::json!({ "code": "INVALID", "field": null, "message": m }))
            .collect();

        let cart_value = if cart {
            serde_json::json!({
                "id": "gid://commerce/Cart/1",
                "checkoutUrl": "https://checkout.example.com/c/1",
                "totalQuantity": 0,
                "cost": {
                    "subtotalAmount": { "amount": "0.0", "currencyCode": "USD" },
                    "totalAmount": { "amount": "0.0", "currencyCode": "USD" },
                    "totalTaxAmount": null
                },
                "lines": { "edges": [] }
            })
        } else {
            serde_json::Value::Null
        };

        serde_json::from_value(serde_json::json!({
            "cart": cart_value,
            "userErrors": errors,
        }))
        .expect("payload should parse")
    }

    #[test]
    fn test_finish_mutation_returns_cart() {
        let cart = finish_mutation(Some(payload_json(true, &[])), "create cart")
            .expect("payload with cart should succeed");
        assert_eq!(cart.id, "gid://commerce/Cart/1");
    }

    #[test]
    fn test_finish_mutation_joins_user_errors() {
        let err = finish_mutation(
            Some(payload_json(true, &["Quantity too large", "Variant is sold out"])),
            "add to cart",
        )
        .expect_err("user errors should fail the mutation");
        assert_eq!(
            err.to_string(),
            "User error: Quantity too large; Variant is sold out"
        );
    }

    #[test]
    fn test_finish_mutation_missing_cart_is_generic_failure() {
        let err = finish_mutation(Some(payload_json(false, &[])), "update cart lines")
            .expect_err("missing cart should fail");
        assert_eq!(err.to_string(), "GraphQL errors: Failed to update cart lines");
    }

    #[test]
    fn test_finish_mutation_missing_payload_is_generic_failure() {
        let err = finish_mutation(None, "remove from cart")
            .expect_err("missing payload should fail");
        assert_eq!(err.to_string(), "GraphQL errors: Failed to remove from cart");
    }

    #[test]
    fn test_mutation_envelope_deserializes() {
        let data: CartLinesAddData = serde_json::from_value(serde_json::json!({
            "cartLinesAdd": {
                "cart": {
                    "id": "gid://commerce/Cart/2",
                    "checkoutUrl": "https://checkout.example.com/c/2",
                    "totalQuantity": 2,
                    "cost": {
                        "subtotalAmount": { "amount": "9.98", "currencyCode": "USD" },
                        "totalAmount": { "amount": "9.98", "currencyCode": "USD" }
                    },
                    "lines": { "edges": [] }
                },
                "userErrors": []
            }
        }))
        .expect("envelope should parse");

        let payload = data.cart_lines_add.expect("payload present");
        assert!(payload.user_errors.is_empty());
        assert_eq!(payload.cart.expect("cart present").total_quantity, 2);
    }
}
