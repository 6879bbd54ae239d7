//! Image background removal pipeline.
//!
//! A rendition is generated at most once per source URL: download the
//! original, have the gateway strip the background, store the result, and
//! record the stored URL in the rendition cache. Later requests for the same
//! source are served straight from the cache.

use std::time::Duration;

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::db::ImageRenditionCache;
use crate::gateway::{GatewayClient, GatewayError};
use crate::resolve::{OnExisting, Resolution, ResolveError, resolve};
use crate::services::scrape::{ScrapeClient, ScrapeError};
use crate::services::storage::{StorageClient, StorageError};

const REMOVE_BACKGROUND_PROMPT: &str = "Remove the background from this product photo completely. \
     Keep the product itself pixel-identical, preserve soft shadows directly under it, \
     and output a transparent PNG.";

/// Download attempts before giving up. Delays grow linearly (1s, 2s).
const DOWNLOAD_ATTEMPTS: u32 = 3;

/// Errors from generating a rendition.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The source image could not be downloaded.
    #[error("download failed: {0}")]
    Download(#[from] ScrapeError),

    /// The gateway failed to process the image.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The processed image could not be stored.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Service for background-removed product image renditions.
pub struct ImageService<'a> {
    pool: &'a PgPool,
    gateway: &'a GatewayClient,
    scrape: &'a ScrapeClient,
    storage: &'a StorageClient,
}

impl<'a> ImageService<'a> {
    /// Create a new image service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        gateway: &'a GatewayClient,
        scrape: &'a ScrapeClient,
        storage: &'a StorageClient,
    ) -> Self {
        Self {
            pool,
            gateway,
            scrape,
            storage,
        }
    }

    /// Resolve the background-removed rendition for `source_url`.
    ///
    /// Cache hits cost one database read. A miss runs the full pipeline;
    /// a source whose last attempt failed is retried.
    ///
    /// # Errors
    ///
    /// Returns a cache error if the rendition store fails, or a generation
    /// error (recorded against the source URL) if the pipeline fails.
    #[instrument(skip(self))]
    pub async fn resolve_rendition(
        &self,
        source_url: &str,
    ) -> Result<Resolution<String>, ResolveError<ImageError>> {
        let cache = ImageRenditionCache::new(self.pool);
        resolve(&cache, source_url, OnExisting::RetryFailed, || {
            self.generate(source_url)
        })
        .await
    }

    /// Run the pipeline: download, remove background, store.
    async fn generate(&self, source_url: &str) -> Result<String, ImageError> {
        let original = self.download_with_retry(source_url).await?;
        let processed = self
            .gateway
            .edit_image(original, "source.png", REMOVE_BACKGROUND_PROMPT)
            .await?;

        let name = object_name(source_url);
        let url = self.storage.upload(&name, processed, "image/png").await?;

        tracing::info!(source_url, url, "generated rendition");
        Ok(url)
    }

    /// Download the source image, retrying transient failures.
    ///
    /// Deterministic failures (bad URL, oversized body) are not retried.
    async fn download_with_retry(&self, source_url: &str) -> Result<Vec<u8>, ScrapeError> {
        let mut attempt = 1;
        loop {
            match self.scrape.fetch_image(source_url).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) => {
                    let transient = matches!(error, ScrapeError::Http(_) | ScrapeError::Status(_));
                    if !transient || attempt >= DOWNLOAD_ATTEMPTS {
                        return Err(error);
                    }
                    tracing::warn!(attempt, error = %error, "image download failed, retrying");
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Storage object name for a rendition.
///
/// The hash prefix groups renditions of the same source; the random suffix
/// makes every upload a fresh object so CDN caches never serve a stale body
/// after a retried generation.
fn object_name(source_url: &str) -> String {
    let digest = Sha256::digest(source_url.as_bytes());
    let mut prefix = hex::encode(digest);
    prefix.truncate(16);

    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("renditions/{prefix}-{suffix}.png")
}
