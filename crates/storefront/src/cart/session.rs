//! Session-backed cart id persistence.
//!
//! The session carries exactly one cart-related value: the opaque cart id
//! under [`keys::CART_ID`]. Contents, totals, and prices are never stored
//! here; they are refetched from the commerce platform.

use tower_sessions::Session;

use crate::cart::CartError;
use crate::cart::store::CartIdStore;

/// Session keys for cart data.
pub mod keys {
    /// Key for storing the commerce cart id.
    pub const CART_ID: &str = "cart_id";
}

/// [`CartIdStore`] backed by the shopper's `tower-sessions` session.
#[derive(Debug, Clone)]
pub struct SessionCartIds {
    session: Session,
}

impl SessionCartIds {
    /// Wrap the request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartIdStore for SessionCartIds {
    async fn get(&self) -> Result<Option<String>, CartError> {
        Ok(self.session.get::<String>(keys::CART_ID).await?)
    }

    async fn set(&self, cart_id: &str) -> Result<(), CartError> {
        Ok(self.session.insert(keys::CART_ID, cart_id).await?)
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.session.remove::<String>(keys::CART_ID).await?;
        Ok(())
    }
}
