//! External service clients used by the storefront.

pub mod marketing;

pub use marketing::{MarketingClient, MarketingError};
