//! Middleware for the functions service.
//!
//! The admin gate is an extractor rather than a layer so each protected
//! handler names its requirement in its own signature. Rate limiting wraps
//! whole route groups.

pub mod auth;
pub mod rate_limit;

pub use auth::RequireAdmin;
pub use rate_limit::{ai_rate_limit_layer, api_rate_limit_layer};
