//! Remote-backed cart store.
//!
//! The commerce platform owns the cart; this module owns only a reference to
//! it (the opaque cart id, persisted in the shopper's session) and a
//! denormalized view rebuilt from the platform's full response after every
//! mutation. Prices and quantities are never computed locally, so the view
//! cannot drift from the backend.
//!
//! [`CartStore`] is an explicitly constructed instance rather than shared
//! module state: handlers build one per request from the session, and tests
//! build as many as they need with in-memory fakes.

mod session;
mod store;

pub use session::SessionCartIds;
pub use store::{CartApi, CartIdStore, CartStore, CartView};

use thiserror::Error;

use crate::commerce::CommerceError;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The commerce platform rejected or failed the call.
    #[error("commerce API error: {0}")]
    Api(#[from] CommerceError),

    /// Reading or writing the persisted cart id failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A line mutation was requested with no cart to mutate.
    #[error("no active cart")]
    NoActiveCart,
}
