//! Object storage client for generated images.
//!
//! Processed images are written to an S3-style HTTP object store and served
//! to shoppers from its public CDN hostname. Only the write path lives here;
//! reads go straight to the public URL this client hands back.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::StorageConfig;

/// Errors from object storage writes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected the write.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client.
    #[error("storage client error: {0}")]
    Parse(String),
}

/// Object storage client. Cheap to clone.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    public_base_url: String,
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.api_token.expose_secret()))
                .map_err(|e| StorageError::Parse(format!("Invalid API token: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Write an object and return its public URL.
    ///
    /// Uploads are last-writer-wins; re-uploading the same object name
    /// overwrites silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the store answers non-2xx.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn upload(
        &self,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!("{}/{}/{object_name}", self.base_url, self.bucket);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(object_name, "stored object");
        Ok(self.public_url(object_name))
    }

    /// Public URL an object is served from.
    #[must_use]
    pub fn public_url(&self, object_name: &str) -> String {
        format!("{}/{}/{object_name}", self.public_base_url, self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            base_url: "https://storage.internal/".to_string(),
            api_token: SecretString::from("kJ8mN2pQ9rS4tU6vW1xY3zA5bC7dE0fG"),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.wildcurrant.example/".to_string(),
        }
    }

    #[test]
    fn test_public_url_joins_bucket_and_name() {
        let client = StorageClient::new(&test_config()).expect("client builds");
        assert_eq!(
            client.public_url("renditions/abc123.png"),
            "https://cdn.wildcurrant.example/media/renditions/abc123.png"
        );
    }

    #[test]
    fn test_client_is_cloneable_and_sendable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<StorageClient>();
    }
}
