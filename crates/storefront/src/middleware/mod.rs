//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Rate limiting (governor, per route group)

pub mod rate_limit;
pub mod session;

pub use rate_limit::{api_rate_limit_layer, newsletter_rate_limit_layer};
pub use session::create_session_layer;
