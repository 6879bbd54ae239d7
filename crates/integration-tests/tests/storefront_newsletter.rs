//! Integration tests for newsletter signup.
//!
//! These tests require:
//! - The storefront server running (cargo run -p wildcurrant-storefront)
//! - Valid marketing credentials in environment (subscribe test only)
//!
//! Run with: cargo test -p wildcurrant-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use wildcurrant_integration_tests::{client, storefront_base_url};

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_malformed_email_rejected_with_field() {
    let base_url = storefront_base_url();

    for bad in ["", "   ", "not-an-email", "missing@tld"] {
        let resp = client()
            .post(format!("{base_url}/api/newsletter"))
            .json(&json!({ "email": bad }))
            .send()
            .await
            .expect("Failed to post signup");

        assert_eq!(
            resp.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "expected rejection for {bad:?}"
        );
        let body: Value = resp.json().await.expect("Failed to parse error body");
        assert_eq!(body["field"], "email");
        assert!(body["error"].is_string());
    }
}

// ============================================================================
// Subscription Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and marketing credentials"]
async fn test_subscribe_succeeds_and_is_idempotent() {
    let base_url = storefront_base_url();
    let email = format!("signup-{}@example.com", Uuid::new_v4());

    let resp = client()
        .post(format!("{base_url}/api/newsletter"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to post signup");
    assert_eq!(resp.status(), StatusCode::OK);

    // A second signup for the same address must not leak that it is already
    // on the list.
    let resp = client()
        .post(format!("{base_url}/api/newsletter"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to post signup");
    assert_eq!(resp.status(), StatusCode::OK);
}
