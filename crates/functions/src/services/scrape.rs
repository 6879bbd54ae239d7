//! Outbound fetcher for external pages and images.
//!
//! Blog imports pull whole HTML pages and the image pipeline downloads
//! source images, both from URLs that arrive in request bodies. Every fetch
//! is https-only and read through a byte cap so a hostile or misconfigured
//! URL cannot balloon memory; page fetches additionally honor the configured
//! host allowlist.

use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::ScrapeConfig;

/// Upper bound on a fetched HTML page.
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// Upper bound on a downloaded source image.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Errors from fetching external resources.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The URL could not be parsed or uses a non-https scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL's host is not on the import allowlist.
    #[error("host not allowed: {0}")]
    DisallowedHost(String),

    /// The remote server answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// The response body exceeded the read cap.
    #[error("response larger than {limit} bytes")]
    TooLarge {
        /// The cap that was exceeded.
        limit: usize,
    },
}

/// Client for fetching external pages and images. Cheap to clone.
#[derive(Clone)]
pub struct ScrapeClient {
    client: reqwest::Client,
    allowed_hosts: Option<Vec<String>>,
}

impl ScrapeClient {
    /// Create a new scrape client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,image/*,*/*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            allowed_hosts: config.allowed_hosts.clone(),
        })
    }

    /// Fetch an HTML page, subject to the host allowlist.
    ///
    /// The body is decoded lossily; imported pages with broken encoding
    /// declarations still yield usable markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or disallowed, the request
    /// fails, the server answers non-2xx, or the body exceeds the page cap.
    #[instrument(skip(self))]
    pub async fn fetch_html(&self, source_url: &str) -> Result<String, ScrapeError> {
        let url = validate_url(source_url, self.allowed_hosts.as_deref())?;
        let bytes = self.fetch_capped(url, MAX_PAGE_BYTES).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Download an image's raw bytes. Any https host is allowed; the
    /// allowlist only guards page imports.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the request fails, the server
    /// answers non-2xx, or the body exceeds the image cap.
    #[instrument(skip(self))]
    pub async fn fetch_image(&self, source_url: &str) -> Result<Vec<u8>, ScrapeError> {
        let url = validate_url(source_url, None)?;
        self.fetch_capped(url, MAX_IMAGE_BYTES).await
    }

    /// GET `url` and read at most `limit` bytes of body.
    async fn fetch_capped(&self, url: Url, limit: usize) -> Result<Vec<u8>, ScrapeError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        // Trust Content-Length when present, but enforce the cap on the
        // actual bytes either way.
        if let Some(length) = response.content_length()
            && length > limit as u64
        {
            return Err(ScrapeError::TooLarge { limit });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > limit {
                return Err(ScrapeError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

/// Parse and vet a caller-supplied URL.
///
/// Requires https. When `allowed_hosts` is set, the host must match one of
/// its entries exactly or be a subdomain of one.
fn validate_url(raw: &str, allowed_hosts: Option<&[String]>) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl(format!("{raw}: {e}")))?;

    if url.scheme() != "https" {
        return Err(ScrapeError::InvalidUrl(format!(
            "{raw}: only https URLs are fetched"
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ScrapeError::InvalidUrl(format!("{raw}: missing host")))?
        .to_lowercase();

    if let Some(allowed) = allowed_hosts {
        let permitted = allowed
            .iter()
            .any(|a| host == *a || host.ends_with(&format!(".{a}")));
        if !permitted {
            return Err(ScrapeError::DisallowedHost(host));
        }
    }

    Ok(url)
}
