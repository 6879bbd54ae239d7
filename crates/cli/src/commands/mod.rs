//! CLI command implementations.

pub mod cache;
pub mod migrate;
pub mod roles;
pub mod wholesale;
