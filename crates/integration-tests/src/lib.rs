//! Integration tests for Wildcurrant.
//!
//! The tests in `tests/` drive running services over HTTP and are marked
//! `#[ignore]` so `cargo test` stays green without infrastructure. Run them
//! explicitly once the services are up:
//!
//! ```bash
//! # Start the services
//! cargo run -p wildcurrant-storefront
//! cargo run -p wildcurrant-functions
//!
//! # Run integration tests
//! cargo test -p wildcurrant-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_*` - Storefront API tests (cart, newsletter)
//! - `functions_*` - Functions API tests (assistant, images, recipes, blog,
//!   wholesale)
//!
//! Tests that seed or inspect rows directly additionally need
//! `FUNCTIONS_DATABASE_URL` pointing at the functions database.

use reqwest::Client;

/// Base URL for the storefront API (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the functions API (configurable via environment).
#[must_use]
pub fn functions_base_url() -> String {
    std::env::var("FUNCTIONS_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Bearer token for an account holding the admin role, if configured.
///
/// Admin-gated tests skip their assertions against protected endpoints when
/// this is absent; the gate-rejection tests never need it.
#[must_use]
pub fn admin_bearer_token() -> Option<String> {
    std::env::var("ADMIN_BEARER_TOKEN").ok()
}

/// Plain client for stateless endpoints.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// Client with a cookie jar, for endpoints keyed on the visitor session.
///
/// Each call returns a fresh jar, so two calls behave as two distinct
/// shoppers.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
