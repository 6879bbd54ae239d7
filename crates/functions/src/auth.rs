//! Auth backend client.
//!
//! Accounts and credentials live in a separate auth backend. This service
//! never sees passwords; callers present a bearer token and we ask the
//! backend who it belongs to. What that account may DO here is decided
//! afterwards, against our own role grants.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthBackendConfig;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the token.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The backend answered with something unexpected.
    #[error("auth backend error: {0}")]
    Backend(String),
}

/// A verified account, as reported by the auth backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Stable account id, used as the key for role grants.
    pub id: Uuid,
    pub email: String,
}

struct AuthClientInner {
    client: reqwest::Client,
    base_url: String,
}

/// Client for the auth backend. Cheap to clone.
#[derive(Clone)]
pub struct AuthBackendClient {
    inner: Arc<AuthClientInner>,
}

impl AuthBackendClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &AuthBackendConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            inner: Arc::new(AuthClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Resolve a bearer token to the account it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] when the backend rejects the
    /// token, [`AuthError::Backend`] on unexpected responses.
    pub async fn verify_token(&self, token: &str) -> Result<Account, AuthError> {
        let response = self
            .inner
            .client
            .get(format!("{}/api/auth/user", self.inner.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Account>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthError::Backend(format!(
                    "unexpected status {status}: {body}"
                )))
            }
        }
    }
}
