//! Wildcurrant Storefront library.
//!
//! Headless backend for the Wildcurrant shop: a session-backed cart over the
//! commerce platform's cart API, plus newsletter signup. Pages are rendered
//! elsewhere; this service only speaks JSON.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod commerce;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
