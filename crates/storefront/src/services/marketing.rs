//! Marketing platform client for newsletter subscriptions.
//!
//! Talks to a self-hosted list manager over its JSON admin API. Only the
//! subscribe path is wired up; campaign content and sending live entirely in
//! the marketing platform.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use wildcurrant_core::Email;

use crate::config::MarketingConfig;

/// Errors that can occur when interacting with the marketing platform.
#[derive(Debug, Error)]
pub enum MarketingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Marketing platform client.
#[derive(Clone)]
pub struct MarketingClient {
    client: reqwest::Client,
    base_url: String,
    list_id: i64,
}

impl MarketingClient {
    /// Create a new marketing API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &MarketingConfig) -> Result<Self, MarketingError> {
        let mut headers = HeaderMap::new();

        // API token auth: "token <user>:<token>"
        let auth_value = format!(
            "token {}:{}",
            config.api_user,
            config.api_token.expose_secret()
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MarketingError::Parse(format!("Invalid API token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            list_id: config.list_id,
        })
    }

    /// Subscribe an email address to the newsletter list.
    ///
    /// Idempotent from the shopper's perspective: an address that is already
    /// on the list reports success rather than a conflict.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn subscribe_email(&self, email: &Email) -> Result<(), MarketingError> {
        let url = format!("{}/api/subscribers", self.base_url);

        let body = serde_json::json!({
            "email": email.as_str(),
            "name": email.local_part(),
            "status": "enabled",
            "lists": [self.list_id],
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        // 409 means the address is already subscribed
        if status == reqwest::StatusCode::CONFLICT {
            tracing::debug!(email = %email, "address already subscribed");
            return Ok(());
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
