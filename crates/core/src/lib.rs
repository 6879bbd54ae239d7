//! Wildcurrant Core - Shared types library.
//!
//! This crate provides common types used across all Wildcurrant components:
//! - `storefront` - Public cart and newsletter service
//! - `functions` - Backend functions service (AI, content, wholesale)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for validated domain values

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
