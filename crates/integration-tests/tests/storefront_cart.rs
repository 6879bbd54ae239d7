//! Integration tests for the storefront cart API.
//!
//! These tests require:
//! - The storefront server running (cargo run -p wildcurrant-storefront)
//! - Valid commerce credentials in environment
//! - `TEST_VARIANT_ID` set to a purchasable variant on the test shop
//!
//! Run with: cargo test -p wildcurrant-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use wildcurrant_integration_tests::{client, session_client, storefront_base_url};

/// Variant the mutation tests add to the cart.
fn test_variant_id() -> String {
    std::env::var("TEST_VARIANT_ID").expect("Set TEST_VARIANT_ID to a purchasable variant")
}

/// Test helper: read the current cart view on a session.
async fn cart_view(client: &reqwest::Client) -> Value {
    let base_url = storefront_base_url();
    let resp = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to get cart view");

    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Failed to parse cart view")
}

/// Test helper: the quantity of a variant in a cart view, zero when absent.
fn quantity_of(view: &Value, variant_id: &str) -> i64 {
    view["items"]
        .as_array()
        .expect("items should be an array")
        .iter()
        .filter(|line| line["merchandise"]["id"] == variant_id)
        .filter_map(|line| line["quantity"].as_i64())
        .sum()
}

// ============================================================================
// Health Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_storefront_health() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to get health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

// ============================================================================
// Cart View Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_fresh_session_sees_empty_cart() {
    let client = session_client();
    let view = cart_view(&client).await;

    assert_eq!(view["count"], 0);
    assert_eq!(view["items"], json!([]));
    assert_eq!(view["checkoutUrl"], Value::Null);
    assert_eq!(view["subtotal"], Value::Null);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_without_cart_is_rejected() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/cart/checkout"))
        .send()
        .await
        .expect("Failed to request checkout");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Cart Mutation Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and commerce credentials"]
async fn test_first_add_creates_cart_persisted_on_session() {
    let client = session_client();
    let base_url = storefront_base_url();
    let variant_id = test_variant_id();

    let resp = client
        .post(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "variant_id": variant_id, "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add line");

    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.expect("Failed to parse cart view");
    assert_eq!(view["count"], 1);
    assert_eq!(quantity_of(&view, &variant_id), 1);
    assert!(view["checkoutUrl"].is_string());
    assert_eq!(view["panelOpen"], true);

    // The cart id lives in the session cookie: a later request on the same
    // jar sees the same cart without re-creating it.
    let reloaded = cart_view(&client).await;
    assert_eq!(reloaded["count"], 1);
    assert_eq!(quantity_of(&reloaded, &variant_id), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce credentials"]
async fn test_zero_quantity_update_removes_line() {
    let client = session_client();
    let base_url = storefront_base_url();
    let variant_id = test_variant_id();

    let resp = client
        .post(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "variant_id": variant_id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to add line");
    assert_eq!(resp.status(), StatusCode::OK);

    let view: Value = resp.json().await.expect("Failed to parse cart view");
    let line_id = view["items"][0]["id"]
        .as_str()
        .expect("added line should have an id")
        .to_string();

    // Setting quantity to zero is a removal, same as DELETE.
    let resp = client
        .patch(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "line_id": line_id, "quantity": 0 }))
        .send()
        .await
        .expect("Failed to update line");

    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.expect("Failed to parse cart view");
    assert_eq!(quantity_of(&view, &variant_id), 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce credentials"]
async fn test_remove_line_empties_cart() {
    let client = session_client();
    let base_url = storefront_base_url();
    let variant_id = test_variant_id();

    let resp = client
        .post(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "variant_id": variant_id }))
        .send()
        .await
        .expect("Failed to add line");
    assert_eq!(resp.status(), StatusCode::OK);

    let view: Value = resp.json().await.expect("Failed to parse cart view");
    let line_id = view["items"][0]["id"]
        .as_str()
        .expect("added line should have an id")
        .to_string();

    let resp = client
        .delete(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "line_id": line_id }))
        .send()
        .await
        .expect("Failed to remove line");

    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.expect("Failed to parse cart view");
    assert_eq!(view["count"], 0);
    assert_eq!(view["items"], json!([]));
}

// ============================================================================
// Session Isolation Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and commerce credentials"]
async fn test_sessions_do_not_share_carts() {
    let shopper_a = session_client();
    let shopper_b = session_client();
    let base_url = storefront_base_url();
    let variant_id = test_variant_id();

    let resp = shopper_a
        .post(format!("{base_url}/api/cart/lines"))
        .json(&json!({ "variant_id": variant_id, "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add line");
    assert_eq!(resp.status(), StatusCode::OK);

    let view_b = cart_view(&shopper_b).await;
    assert_eq!(view_b["count"], 0);
    assert_eq!(view_b["items"], json!([]));
}
