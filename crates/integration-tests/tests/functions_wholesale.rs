//! Integration tests for wholesale applications.
//!
//! These tests require:
//! - The functions server running (cargo run -p wildcurrant-functions)
//! - A running `PostgreSQL` database with migrations applied
//! - `FUNCTIONS_DATABASE_URL` for row cleanup
//! - `ADMIN_BEARER_TOKEN` for the sync flow test
//!
//! Run with: cargo test -p wildcurrant-integration-tests -- --ignored

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use wildcurrant_integration_tests::{admin_bearer_token, client, functions_base_url};

/// The slice of an application response these tests assert on.
#[derive(Debug, Deserialize)]
struct ApplicationView {
    id: Uuid,
    business_name: String,
    email: String,
    status: String,
}

/// Test helper: connect to the functions database for cleanup.
async fn functions_pool() -> PgPool {
    let url = std::env::var("FUNCTIONS_DATABASE_URL").expect("FUNCTIONS_DATABASE_URL must be set");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to functions database")
}

/// Test helper: submit an application for an email.
async fn submit_application(email: &str) -> reqwest::Response {
    let base_url = functions_base_url();
    client()
        .post(format!("{base_url}/api/wholesale/applications"))
        .json(&json!({
            "business_name": "Curious Cellars",
            "contact_name": "Alex Larsson",
            "email": email,
            "phone": "+44 20 7946 0000",
        }))
        .send()
        .await
        .expect("Failed to submit application")
}

/// Test helper: delete an application and any customer row derived from it.
async fn delete_application(pool: &PgPool, id: Uuid) {
    sqlx::query("DELETE FROM functions.wholesale_customers WHERE application_id = $1")
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to delete customer row");
    sqlx::query("DELETE FROM functions.wholesale_applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to delete application row");
}

// ============================================================================
// Application Validation Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server"]
async fn test_application_validation_names_offending_field() {
    let base_url = functions_base_url();

    let resp = client()
        .post(format!("{base_url}/api/wholesale/applications"))
        .json(&json!({
            "business_name": "Curious Cellars",
            "contact_name": "Alex Larsson",
            "email": "not-an-email",
        }))
        .send()
        .await
        .expect("Failed to submit application");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["field"], "email");

    let resp = client()
        .post(format!("{base_url}/api/wholesale/applications"))
        .json(&json!({
            "business_name": "   ",
            "contact_name": "Alex Larsson",
            "email": "buyer@example.com",
        }))
        .send()
        .await
        .expect("Failed to submit application");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["field"], "business_name");
}

// ============================================================================
// Application Lifecycle Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server and database"]
async fn test_duplicate_application_conflicts() {
    let pool = functions_pool().await;
    let email = format!("wholesale-{}@example.com", Uuid::new_v4());

    let resp = submit_application(&email).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let application: ApplicationView = resp.json().await.expect("Failed to parse application");
    assert_eq!(application.email, email);
    assert_eq!(application.business_name, "Curious Cellars");
    assert_eq!(application.status, "pending");

    // One application per email. The second must not replace the first.
    let resp = submit_application(&email).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    delete_application(&pool, application.id).await;
}

#[tokio::test]
#[ignore = "Requires running functions server and database"]
async fn test_status_check_for_unknown_email_is_inactive() {
    let base_url = functions_base_url();
    let email = format!("nobody-{}@example.com", Uuid::new_v4());

    let resp = client()
        .get(format!("{base_url}/api/wholesale/status"))
        .query(&[("email", email.as_str())])
        .send()
        .await
        .expect("Failed to check status");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse status");
    assert_eq!(body["active"], false);
}

#[tokio::test]
#[ignore = "Requires running functions server"]
async fn test_status_check_validates_email() {
    let base_url = functions_base_url();
    let resp = client()
        .get(format!("{base_url}/api/wholesale/status"))
        .query(&[("email", "not-an-email")])
        .send()
        .await
        .expect("Failed to check status");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["field"], "email");
}

// ============================================================================
// Approval Sync Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running functions server"]
async fn test_sync_requires_bearer_token() {
    let base_url = functions_base_url();
    let resp = client()
        .post(format!("{base_url}/api/wholesale/sync"))
        .send()
        .await
        .expect("Failed to post sync");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
#[ignore = "Requires running functions server, database, and admin token"]
async fn test_approved_application_becomes_active_after_sync() {
    let Some(token) = admin_bearer_token() else {
        panic!("Set ADMIN_BEARER_TOKEN for this test");
    };
    let pool = functions_pool().await;
    let base_url = functions_base_url();
    let email = format!("wholesale-{}@example.com", Uuid::new_v4());

    let resp = submit_application(&email).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let application: ApplicationView = resp.json().await.expect("Failed to parse application");

    // Approval normally happens through the CLI; flip the row directly.
    sqlx::query("UPDATE functions.wholesale_applications SET status = 'approved' WHERE id = $1")
        .bind(application.id)
        .execute(&pool)
        .await
        .expect("Failed to approve application");

    let resp = client()
        .post(format!("{base_url}/api/wholesale/sync"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to post sync");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse sync result");
    assert!(body["synced"].as_i64().expect("synced should be a number") >= 1);

    // The approval is now visible to the public status check and the row is
    // stamped as materialized.
    let resp = client()
        .get(format!("{base_url}/api/wholesale/status"))
        .query(&[("email", email.as_str())])
        .send()
        .await
        .expect("Failed to check status");
    let status: Value = resp.json().await.expect("Failed to parse status");
    assert_eq!(status["active"], true);

    let stamped: bool = sqlx::query_scalar(
        "SELECT synced_at IS NOT NULL FROM functions.wholesale_applications WHERE id = $1",
    )
    .bind(application.id)
    .fetch_one(&pool)
    .await
    .expect("Failed to read synced_at");
    assert!(stamped);

    delete_application(&pool, application.id).await;
}
