//! Core types for Wildcurrant.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;

pub use email::{Email, EmailError};
