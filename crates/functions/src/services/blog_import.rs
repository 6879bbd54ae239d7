//! Blog post import from external article URLs.
//!
//! An import fetches the page, lifts the title, excerpt, hero image and
//! publication date out of its meta tags, isolates the article markup, and
//! has the gateway convert that markup to Markdown. The result is stored as
//! a post under a slug derived from the title. Imports are keyed by source
//! URL, so re-importing a URL that already completed is a cache hit and a
//! failed import can be retried.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::db::blog::{BlogPost, PostDraft};
use crate::db::{BlogImportCache, BlogPostRepository, RepositoryError};
use crate::gateway::{ChatMessage, GatewayClient, GatewayError};
use crate::resolve::{OnExisting, Resolution, ResolveError, resolve};
use crate::services::recipes::strip_code_fence;
use crate::services::scrape::{ScrapeClient, ScrapeError};

const MARKDOWN_SYSTEM_PROMPT: &str = "You convert article HTML into clean Markdown. Preserve \
     headings, paragraphs, lists, blockquotes, links and image references. Drop navigation, \
     bylines, share widgets, newsletter prompts, cookie banners and any other page chrome. \
     Output only the Markdown body. No code fences, no front matter, and do not repeat the \
     article title as a heading.";

/// Largest article fragment handed to the gateway for conversion.
const MAX_ARTICLE_HTML_BYTES: usize = 64 * 1024;

/// Any `<meta ...>` tag.
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("Invalid regex"));

/// The `property`/`name` attribute inside a meta tag.
static META_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(?:property|name)\s*=\s*["']([^"']+)["']"#).expect("Invalid regex")
});

/// The `content` attribute inside a meta tag.
static META_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\scontent\s*=\s*["']([^"']*)["']"#).expect("Invalid regex")
});

/// The document `<title>` element.
static TITLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("Invalid regex"));

/// Article regions, most specific first.
static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("Invalid regex"));
static MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").expect("Invalid regex"));
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)</body>").expect("Invalid regex"));

/// Markup that never carries article content.
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("Invalid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("Invalid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"));

/// Errors from importing one post.
#[derive(Debug, Error)]
pub enum BlogImportError {
    /// The source page could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(#[from] ScrapeError),

    /// The page lacked something an import needs.
    #[error("could not extract article: {0}")]
    Extract(String),

    /// The gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The model's conversion was unusable.
    #[error("conversion failed: {0}")]
    Convert(String),

    /// A database read during import failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service for importing external articles as blog posts.
pub struct BlogImportService<'a> {
    pool: &'a PgPool,
    scrape: &'a ScrapeClient,
    gateway: &'a GatewayClient,
}

impl<'a> BlogImportService<'a> {
    /// Create a new blog import service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, scrape: &'a ScrapeClient, gateway: &'a GatewayClient) -> Self {
        Self {
            pool,
            scrape,
            gateway,
        }
    }

    /// Import the article at `source_url`, or serve the prior import.
    ///
    /// # Errors
    ///
    /// Returns a cache error if the import store fails (including a slug
    /// collision while persisting), or a generation error recorded against
    /// the source URL.
    #[instrument(skip(self))]
    pub async fn import(
        &self,
        source_url: &str,
    ) -> Result<Resolution<BlogPost>, ResolveError<BlogImportError>> {
        let cache = BlogImportCache::new(self.pool);
        resolve(&cache, source_url, OnExisting::RetryFailed, || {
            self.generate(source_url)
        })
        .await
    }

    /// Fetch, extract, convert, and assemble a post draft.
    async fn generate(&self, source_url: &str) -> Result<PostDraft, BlogImportError> {
        let html = self.scrape.fetch_html(source_url).await?;
        let page = extract_page(&html);

        let title = page
            .title
            .ok_or_else(|| BlogImportError::Extract("page has no usable title".to_string()))?;

        let body_markdown = self.to_markdown(&page.article_html).await?;
        let slug = self.unique_slug(&title).await?;

        tracing::info!(source_url, slug, "imported article");
        Ok(PostDraft {
            title,
            slug,
            excerpt: page.description,
            body_markdown,
            hero_image_url: page.hero_image_url,
            published_at: page.published_at,
        })
    }

    /// Convert article markup to Markdown via the gateway.
    async fn to_markdown(&self, article_html: &str) -> Result<String, BlogImportError> {
        let fragment = truncate_to_char_boundary(article_html, MAX_ARTICLE_HTML_BYTES);

        let messages = vec![
            ChatMessage::system(MARKDOWN_SYSTEM_PROMPT),
            ChatMessage::user(fragment.to_string()),
        ];

        let completion = self.gateway.chat(messages, None).await?;
        let markdown = completion
            .first_content()
            .map(strip_code_fence)
            .unwrap_or_default()
            .to_string();

        if markdown.is_empty() {
            return Err(BlogImportError::Convert(
                "model returned an empty conversion".to_string(),
            ));
        }

        Ok(markdown)
    }

    /// Derive a slug from the title, suffixing `-2`, `-3`, ... on collision.
    async fn unique_slug(&self, title: &str) -> Result<String, RepositoryError> {
        let repository = BlogPostRepository::new(self.pool);
        let base = slug_base(title);

        if !repository.slug_exists(&base).await? {
            return Ok(base);
        }

        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !repository.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

/// What the page's markup yields before conversion.
#[derive(Debug)]
struct ExtractedPage {
    title: Option<String>,
    description: Option<String>,
    hero_image_url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    article_html: String,
}

/// Pull title, excerpt, hero image, date, and the article region from a page.
fn extract_page(html: &str) -> ExtractedPage {
    let title = extract_meta(html, &["og:title", "twitter:title"]).or_else(|| {
        TITLE_TAG_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str()).trim().to_string())
            .filter(|t| !t.is_empty())
    });

    let description = extract_meta(html, &["og:description", "description", "twitter:description"]);
    let hero_image_url = extract_meta(html, &["og:image", "twitter:image"]);

    let published_at = extract_meta(html, &["article:published_time"])
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let region = ARTICLE_RE
        .captures(html)
        .or_else(|| MAIN_RE.captures(html))
        .or_else(|| BODY_RE.captures(html))
        .and_then(|c| c.get(1))
        .map_or(html, |m| m.as_str());

    let article_html = COMMENT_RE
        .replace_all(
            &STYLE_RE.replace_all(&SCRIPT_RE.replace_all(region, ""), ""),
            "",
        )
        .trim()
        .to_string();

    ExtractedPage {
        title,
        description,
        hero_image_url,
        published_at,
        article_html,
    }
}

/// First non-empty `content` among meta tags whose `property`/`name` matches
/// one of `keys`. Attribute order within the tag does not matter.
fn extract_meta(html: &str, keys: &[&str]) -> Option<String> {
    for tag in META_TAG_RE.find_iter(html) {
        let tag = tag.as_str();

        let Some(name) = META_NAME_RE.captures(tag).and_then(|c| c.get(1)) else {
            continue;
        };
        if !keys.iter().any(|k| name.as_str().eq_ignore_ascii_case(k)) {
            continue;
        }

        if let Some(content) = META_CONTENT_RE.captures(tag).and_then(|c| c.get(1)) {
            let value = decode_entities(content.as_str());
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Decode the handful of HTML entities that show up in meta content.
fn decode_entities(text: &str) -> String {
    // `&amp;` last so already-decoded ampersands aren't decoded twice.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Slug for a title, with a fallback for titles that slugify to nothing.
fn slug_base(title: &str) -> String {
    let base = slug::slugify(title);
    if base.is_empty() {
        "post".to_string()
    } else {
        base
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
fn truncate_to_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    loop {
        if let Some(prefix) = text.get(..end) {
            return prefix;
        }
        end -= 1;
    }
}
