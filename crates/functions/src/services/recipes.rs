//! Occasion recipe generation.
//!
//! Marketing batches these ahead of campaigns: one occasion, many products.
//! Each (product, occasion) pair is generated at most once ever; a pair with
//! any existing row, whatever its status, is skipped rather than retried.
//! Clearing a bad row is a deliberate operator action via the CLI.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::db::recipes::{Recipe, RecipeContent, RecipeKey};
use crate::db::{RecipeRepository, RepositoryError};
use crate::gateway::{ChatMessage, GatewayClient, GatewayError, ResponseFormat};
use crate::resolve::{OnExisting, Resolution, ResolveError, resolve};

const RECIPE_SYSTEM_PROMPT: &str = "You are a beverage developer for Wildcurrant, a maker of \
     non-alcoholic aperitifs and sparkling botanicals. You write serve recipes that center one \
     Wildcurrant product, use accessible ingredients, and never include alcohol. \
     Answer with a single JSON object with exactly these fields: \
     \"title\" (string), \"description\" (string, two sentences max), \
     \"ingredients\" (array of strings with quantities), \
     \"instructions\" (array of strings, one step each), \
     \"garnish\" (string, optional), \"glassware\" (string, optional). \
     No markdown, no commentary.";

/// Errors from generating one recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The model's response was not a usable recipe.
    #[error("model response was not a valid recipe: {0}")]
    InvalidRecipe(String),
}

/// One product that failed to generate.
#[derive(Debug, Serialize)]
pub struct FailedGeneration {
    pub product_id: String,
    pub error: String,
}

/// Outcome of a batch generation request.
#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    /// Freshly generated recipes.
    pub generated: Vec<Recipe>,
    /// Products whose pair already had a row, whatever its status.
    pub skipped: Vec<String>,
    /// Products whose generation failed this time.
    pub failed: Vec<FailedGeneration>,
}

/// Service for generating occasion recipes.
pub struct RecipeService<'a> {
    pool: &'a PgPool,
    gateway: &'a GatewayClient,
}

impl<'a> RecipeService<'a> {
    /// Create a new recipe service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a GatewayClient) -> Self {
        Self { pool, gateway }
    }

    /// Generate recipes for one occasion across `products`, sequentially.
    ///
    /// Per-product generation failures are reported in the result, not
    /// returned as errors; the batch keeps going.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cache store itself fails; that aborts
    /// the remainder of the batch.
    #[instrument(skip(self, products), fields(products = products.len()))]
    pub async fn generate_for_occasion(
        &self,
        occasion: &str,
        products: &[String],
    ) -> Result<GenerationReport, RepositoryError> {
        let repository = RecipeRepository::new(self.pool);
        let mut report = GenerationReport::default();

        for product_id in products {
            let key = RecipeKey::new(product_id, occasion);

            let outcome = resolve(&repository, &key, OnExisting::Skip, || {
                self.generate_one(product_id, occasion)
            })
            .await;

            match outcome {
                Ok(Resolution::Fresh(recipe)) => report.generated.push(recipe),
                Ok(Resolution::Cached(_) | Resolution::InFlight | Resolution::Skipped) => {
                    report.skipped.push(product_id.clone());
                }
                Err(ResolveError::Generation(error)) => {
                    tracing::warn!(product_id, error = %error, "recipe generation failed");
                    report.failed.push(FailedGeneration {
                        product_id: product_id.clone(),
                        error: error.to_string(),
                    });
                }
                Err(ResolveError::Cache(error)) => return Err(error),
            }
        }

        Ok(report)
    }

    /// Ask the gateway for one recipe in JSON mode and parse it.
    async fn generate_one(
        &self,
        product_id: &str,
        occasion: &str,
    ) -> Result<RecipeContent, RecipeError> {
        let messages = vec![
            ChatMessage::system(RECIPE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Create a serve recipe for the occasion \"{occasion}\" built around the \
                 Wildcurrant product \"{product_id}\"."
            )),
        ];

        let completion = self
            .gateway
            .chat(messages, Some(ResponseFormat::JsonObject))
            .await?;

        let content = completion
            .first_content()
            .ok_or_else(|| RecipeError::InvalidRecipe("empty completion".to_string()))?;

        parse_recipe(content)
    }
}

/// Parse a model completion into recipe content.
fn parse_recipe(content: &str) -> Result<RecipeContent, RecipeError> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| RecipeError::InvalidRecipe(e.to_string()))
}

/// Strip a markdown code fence if the model wrapped its output in one.
///
/// JSON mode makes this rare, but some routed models still fence.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE_JSON: &str = r#"{
        "title": "Blackcurrant Garden Spritz",
        "description": "Bright and herbal.",
        "ingredients": ["100ml Wildcurrant Aperitif", "Soda water"],
        "instructions": ["Build over ice.", "Top with soda."],
        "garnish": "Mint sprig"
    }"#;

    #[test]
    fn test_parse_recipe_accepts_plain_json() {
        let recipe = parse_recipe(RECIPE_JSON).expect("valid recipe");
        assert_eq!(recipe.title, "Blackcurrant Garden Spritz");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.garnish.as_deref(), Some("Mint sprig"));
        assert!(recipe.glassware.is_none());
    }

    #[test]
    fn test_parse_recipe_strips_code_fences() {
        let fenced = format!("```json\n{RECIPE_JSON}\n```");
        let recipe = parse_recipe(&fenced).expect("fenced recipe parses");
        assert_eq!(recipe.title, "Blackcurrant Garden Spritz");

        let bare_fence = format!("```\n{RECIPE_JSON}\n```");
        assert!(parse_recipe(&bare_fence).is_ok());
    }

    #[test]
    fn test_parse_recipe_rejects_non_recipe_output() {
        let err = parse_recipe("Sorry, I can't help with that.").expect_err("prose is not a recipe");
        assert!(matches!(err, RecipeError::InvalidRecipe(_)));

        let err = parse_recipe(r#"{"title": "No ingredients"}"#).expect_err("missing fields");
        assert!(matches!(err, RecipeError::InvalidRecipe(_)));
    }

    #[test]
    fn test_strip_code_fence_leaves_unfenced_content_alone() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
