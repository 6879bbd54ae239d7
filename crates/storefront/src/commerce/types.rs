//! Domain types for the commerce cart API.
//!
//! These types double as the wire format: they deserialize directly from the
//! GraphQL response JSON (camelCase) and serialize back out through our own
//! JSON API in the same shape, so handlers never re-map fields.

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Money Types
// =============================================================================

/// Monetary amount with currency code.
///
/// The amount is a decimal string taken verbatim from the commerce platform.
/// It is never parsed or recomputed locally; display code passes it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

// =============================================================================
// Image Types
// =============================================================================

/// Product or variant image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Cart cost summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    /// Subtotal before tax/shipping.
    pub subtotal_amount: Money,
    /// Total amount.
    pub total_amount: Money,
    /// Total tax amount.
    #[serde(default)]
    pub total_tax_amount: Option<Money>,
}

/// Cost for a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCost {
    /// Price per unit.
    pub amount_per_quantity: Money,
    /// Total (after discounts).
    pub total_amount: Money,
}

/// Parent product snapshot for cart merchandise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseProduct {
    /// Product ID.
    pub id: String,
    /// Product handle.
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Featured image.
    #[serde(default)]
    pub featured_image: Option<Image>,
}

/// Merchandise in a cart line.
///
/// This is a display snapshot captured at last fetch time, not a live catalog
/// reference. It may go stale and is never used for charge calculation; the
/// authoritative price lives in the line and cart cost fields returned by the
/// commerce platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchandise {
    /// Variant ID.
    pub id: String,
    /// Variant title.
    pub title: String,
    /// Price at last fetch.
    pub price: Money,
    /// Variant image.
    #[serde(default)]
    pub image: Option<Image>,
    /// Parent product snapshot.
    pub product: MerchandiseProduct,
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart line ID.
    pub id: String,
    /// Quantity. The commerce platform never returns a line with quantity
    /// below one; removal deletes the line instead.
    pub quantity: i64,
    /// Line cost.
    pub cost: CartLineCost,
    /// Product variant snapshot.
    pub merchandise: Merchandise,
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart ID.
    pub id: String,
    /// Checkout URL. Handed to the shopper as-is, never interpreted.
    pub checkout_url: String,
    /// Total item quantity across all lines.
    pub total_quantity: i64,
    /// Cart cost summary.
    pub cost: CartCost,
    /// Cart lines, flattened from the GraphQL connection.
    #[serde(deserialize_with = "connection_nodes")]
    pub lines: Vec<CartLine>,
}

// =============================================================================
// Mutation Inputs
// =============================================================================

/// Input for adding a line to cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product variant ID.
    pub merchandise_id: String,
    /// Quantity to add.
    pub quantity: i64,
}

/// Input for updating a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateInput {
    /// Cart line ID.
    pub id: String,
    /// New quantity.
    pub quantity: i64,
}

/// User error from cart mutations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUserError {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Field path that caused the error.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable error message.
    pub message: String,
}

/// Flatten a GraphQL `{ edges: [{ node: T }] }` connection into a plain list.
fn connection_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    struct Connection<T> {
        edges: Vec<Edge<T>>,
    }

    #[derive(Deserialize)]
    struct Edge<T> {
        node: T,
    }

    let connection = Connection::deserialize(deserializer)?;
    Ok(connection.edges.into_iter().map(|e| e.node).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cart_json() -> serde_json::Value {
        serde_json::json!({
            "id": "gid://commerce/Cart/abc123",
            "checkoutUrl": "https://checkout.example.com/c/abc123",
            "totalQuantity": 3,
            "cost": {
                "subtotalAmount": { "amount": "14.97", "currencyCode": "USD" },
                "totalAmount": { "amount": "16.12", "currencyCode": "USD" },
                "totalTaxAmount": { "amount": "1.15", "currencyCode": "USD" }
            },
            "lines": {
                "edges": [
                    {
                        "node": {
                            "id": "gid://commerce/CartLine/1",
                            "quantity": 3,
                            "cost": {
                                "amountPerQuantity": { "amount": "4.99", "currencyCode": "USD" },
                                "totalAmount": { "amount": "14.97", "currencyCode": "USD" }
                            },
                            "merchandise": {
                                "id": "gid://commerce/ProductVariant/10",
                                "title": "4-pack",
                                "price": { "amount": "4.99", "currencyCode": "USD" },
                                "image": null,
                                "product": {
                                    "id": "gid://commerce/Product/7",
                                    "handle": "blackcurrant-spritz",
                                    "title": "Blackcurrant Spritz",
                                    "featuredImage": {
                                        "url": "https://cdn.example.com/spritz.jpg",
                                        "altText": "A can of Blackcurrant Spritz"
                                    }
                                }
                            }
                        }
                    }
                ]
            }
        })
    }

    #[test]
    fn test_cart_deserializes_from_graphql_shape() {
        let cart: Cart =
            serde_json::from_value(sample_cart_json()).expect("cart JSON should parse");

        assert_eq!(cart.id, "gid://commerce/Cart/abc123");
        assert_eq!(cart.total_quantity, 3);
        assert_eq!(cart.cost.total_amount.amount, "16.12");
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.lines[0].merchandise.product.handle, "blackcurrant-spritz");
    }

    #[test]
    fn test_cart_serializes_lines_as_plain_array() {
        let cart: Cart =
            serde_json::from_value(sample_cart_json()).expect("cart JSON should parse");
        let out = serde_json::to_value(&cart).expect("cart should serialize");

        // Our own JSON API exposes lines as a flat array, not edges/node.
        assert!(out["lines"].is_array());
        assert_eq!(out["lines"][0]["merchandise"]["title"], "4-pack");
        assert_eq!(out["checkoutUrl"], "https://checkout.example.com/c/abc123");
    }

    #[test]
    fn test_money_amount_stays_a_string() {
        let money: Money =
            serde_json::from_str(r#"{"amount": "4.90", "currencyCode": "USD"}"#)
                .expect("money should parse");
        // Trailing zero preserved exactly as sent.
        assert_eq!(money.amount, "4.90");
    }

    #[test]
    fn test_line_input_serializes_camel_case() {
        let input = CartLineInput {
            merchandise_id: "gid://commerce/ProductVariant/10".to_string(),
            quantity: 2,
        };
        let out = serde_json::to_value(&input).expect("input should serialize");
        assert_eq!(out["merchandiseId"], "gid://commerce/ProductVariant/10");
        assert_eq!(out["quantity"], 2);
    }
}
