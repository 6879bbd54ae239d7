//! Integration tests for blog import and serving.
//!
//! These tests require:
//! - The functions server running (cargo run -p wildcurrant-functions)
//! - A running `PostgreSQL` database with migrations applied
//! - `ADMIN_BEARER_TOKEN` for tests that hit the import endpoint
//!
//! Run with: cargo test -p wildcurrant-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use wildcurrant_integration_tests::{admin_bearer_token, client, functions_base_url};

// ============================================================================
// Admin Gate Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server"]
async fn test_import_requires_bearer_token() {
    let base_url = functions_base_url();
    let resp = client()
        .post(format!("{base_url}/api/blog/import"))
        .json(&json!({ "source_url": "https://press.example.com/article" }))
        .send()
        .await
        .expect("Failed to post import");

    // The gate answers before the source URL is ever fetched.
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
#[ignore = "Requires running functions server"]
async fn test_import_rejects_malformed_bearer_scheme() {
    let base_url = functions_base_url();
    let resp = client()
        .post(format!("{base_url}/api/blog/import"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .json(&json!({ "source_url": "https://press.example.com/article" }))
        .send()
        .await
        .expect("Failed to post import");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Import Validation Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server, database, and admin token"]
async fn test_import_rejects_plain_http_source() {
    let Some(token) = admin_bearer_token() else {
        panic!("Set ADMIN_BEARER_TOKEN for this test");
    };
    let base_url = functions_base_url();

    let resp = client()
        .post(format!("{base_url}/api/blog/import"))
        .bearer_auth(&token)
        .json(&json!({ "source_url": "http://press.example.com/article" }))
        .send()
        .await
        .expect("Failed to post import");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert!(body["error"].is_string());
}

// ============================================================================
// Serving Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server and database"]
async fn test_posts_listing_is_public() {
    let base_url = functions_base_url();
    let resp = client()
        .get(format!("{base_url}/api/blog/posts"))
        .send()
        .await
        .expect("Failed to list posts");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse posts");
    assert!(body["posts"].is_array());
}

#[tokio::test]
#[ignore = "Requires running functions server and database"]
async fn test_unknown_slug_is_not_found() {
    let base_url = functions_base_url();
    let slug = format!("no-such-post-{}", Uuid::new_v4());

    let resp = client()
        .get(format!("{base_url}/api/blog/posts/{slug}"))
        .send()
        .await
        .expect("Failed to get post");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
