//! Business logic services for the functions service.
//!
//! # Services
//!
//! - `assistant` - Persona chat streamed over the AI gateway
//! - `blog_import` - Article import: scrape, convert to Markdown, store
//! - `images` - Background-removal pipeline for product images
//! - `recipes` - Occasion recipe generation in JSON mode
//! - `scrape` - Capped https fetcher for pages and images
//! - `storage` - Object storage writes for generated images

pub mod assistant;
pub mod blog_import;
pub mod images;
pub mod recipes;
pub mod scrape;
pub mod storage;

pub use assistant::{AssistantError, AssistantService, Persona};
pub use blog_import::{BlogImportError, BlogImportService};
pub use images::{ImageError, ImageService};
pub use recipes::{GenerationReport, RecipeError, RecipeService};
pub use scrape::{ScrapeClient, ScrapeError};
pub use storage::{StorageClient, StorageError};
