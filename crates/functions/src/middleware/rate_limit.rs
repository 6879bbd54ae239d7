//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two tiers: AI-backed endpoints (assistant chat, image pipeline) get a
//! strict per-IP budget because every request can cost gateway credits;
//! the plain read/write API gets a relaxed one.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers that can carry the real client IP, most trusted first.
const IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor that resolves the client IP behind Cloudflare and Fly.io.
#[derive(Clone, Copy)]
pub struct CloudflareIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for CloudflareIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        IP_HEADERS
            .iter()
            .find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    // X-Forwarded-For chains addresses; the first is the client.
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<CloudflareIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for AI-backed endpoints: ~6 requests per minute per IP.
///
/// Configuration: 1 request every 10 seconds (replenish), burst of 3.
/// A chat turn or an image generation is expensive upstream; nobody mixing
/// drinks needs more than this.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(10)` and `burst_size(3)`), which are always
/// accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn ai_rate_limit_layer() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(10) // Replenish 1 token every 10 seconds (~6/minute)
        .burst_size(3) // Allow a short burst
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(3) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for the plain API: ~60 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 30.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(30)`), which are always
/// accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limit_layer() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(1) // Replenish quickly
        .burst_size(30) // Allow burst of 30 requests
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(30) is valid");
    GovernorLayer::new(Arc::new(config))
}
