//! AI gateway integration.
//!
//! All model calls go through a single OpenAI-compatible gateway rather than
//! per-vendor SDKs: chat completions (streaming and not) for the shopping and
//! mixology assistants and for recipe generation, and image edits for
//! background removal. The gateway holds the vendor keys; this service holds
//! one gateway key.

mod client;
mod error;
pub mod types;

pub use client::GatewayClient;
pub use error::GatewayError;
pub use types::{ChatChunk, ChatCompletion, ChatMessage, ResponseFormat, Role};
