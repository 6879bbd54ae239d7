//! Functions service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string
//! - `AI_GATEWAY_URL` - Base URL of the OpenAI-compatible AI gateway
//! - `AI_GATEWAY_API_KEY` - API key for the AI gateway
//! - `AUTH_BACKEND_URL` - Base URL of the auth backend that verifies bearer tokens
//! - `STORAGE_URL` - Base URL of the object storage API
//! - `STORAGE_API_TOKEN` - Bearer token for object storage writes
//! - `STORAGE_PUBLIC_URL` - Public base URL where stored objects are served
//!
//! ## Optional
//! - `FUNCTIONS_HOST` - Bind address (default: 127.0.0.1)
//! - `FUNCTIONS_PORT` - Listen port (default: 3001)
//! - `AI_CHAT_MODEL` - Chat model ID (default: gpt-4o-mini)
//! - `AI_IMAGE_MODEL` - Image edit model ID (default: gpt-image-1)
//! - `STORAGE_BUCKET` - Storage bucket name (default: media)
//! - `SCRAPE_USER_AGENT` - User agent sent when fetching external pages
//! - `SCRAPE_TIMEOUT_SECS` - Per-request scrape timeout (default: 20)
//! - `BLOG_IMPORT_ALLOWED_HOSTS` - Comma-separated hosts imports may fetch from
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_SCRAPE_USER_AGENT: &str = "WildcurrantBot/1.0 (+https://wildcurrant.example)";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Functions service configuration.
#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// AI gateway configuration
    pub gateway: GatewayConfig,
    /// Auth backend configuration
    pub auth: AuthBackendConfig,
    /// External page fetching configuration
    pub scrape: ScrapeConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// AI gateway configuration.
///
/// The gateway speaks the `OpenAI` wire format and holds the actual vendor
/// keys; this service only ever sees the gateway credential.
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway base URL (e.g., <https://gateway.internal/v1>)
    pub base_url: String,
    /// Gateway API key
    pub api_key: SecretString,
    /// Model ID for chat completions
    pub chat_model: String,
    /// Model ID for image edits
    pub image_model: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("chat_model", &self.chat_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("AI_GATEWAY_URL")?,
            api_key: get_validated_secret("AI_GATEWAY_API_KEY")?,
            chat_model: get_env_or_default("AI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            image_model: get_env_or_default("AI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
        })
    }
}

/// Auth backend configuration.
///
/// The auth backend owns accounts and verifies bearer tokens; this service
/// never sees credentials, only tokens to verify.
#[derive(Debug, Clone)]
pub struct AuthBackendConfig {
    /// Auth backend base URL
    pub base_url: String,
}

impl AuthBackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("AUTH_BACKEND_URL")?,
        })
    }
}

/// External page fetching configuration for blog imports.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// User agent sent with scrape requests
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Hosts imports may fetch from. `None` allows any https host.
    pub allowed_hosts: Option<Vec<String>>,
}

impl ScrapeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("SCRAPE_TIMEOUT_SECS", "20")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SCRAPE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let allowed_hosts = get_optional_env("BLOG_IMPORT_ALLOWED_HOSTS").map(|hosts| {
            hosts
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect()
        });

        Ok(Self {
            user_agent: get_env_or_default("SCRAPE_USER_AGENT", DEFAULT_SCRAPE_USER_AGENT),
            timeout_secs,
            allowed_hosts,
        })
    }
}

/// Object storage configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StorageConfig {
    /// Storage API base URL
    pub base_url: String,
    /// Bearer token for writes
    pub api_token: SecretString,
    /// Bucket objects are written into
    pub bucket: String,
    /// Public base URL where stored objects are served
    pub public_base_url: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("STORAGE_URL")?,
            api_token: get_validated_secret("STORAGE_API_TOKEN")?,
            bucket: get_env_or_default("STORAGE_BUCKET", "media"),
            public_base_url: get_required_env("STORAGE_PUBLIC_URL")?,
        })
    }
}

impl FunctionsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("FUNCTIONS_DATABASE_URL")?;
        let host = get_env_or_default("FUNCTIONS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("FUNCTIONS_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_PORT".to_string(), e.to_string()))?;

        let gateway = GatewayConfig::from_env()?;
        let auth = AuthBackendConfig::from_env()?;
        let scrape = ScrapeConfig::from_env()?;
        let storage = StorageConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            gateway,
            auth,
            scrape,
            storage,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the AI gateway configuration.
    #[must_use]
    pub const fn gateway(&self) -> &GatewayConfig {
        &self.gateway
    }

    /// Returns a reference to the auth backend configuration.
    #[must_use]
    pub const fn auth(&self) -> &AuthBackendConfig {
        &self.auth
    }

    /// Returns a reference to the object storage configuration.
    #[must_use]
    pub const fn storage(&self) -> &StorageConfig {
        &self.storage
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., FUNCTIONS_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_models() {
        assert_eq!(DEFAULT_CHAT_MODEL, "gpt-4o-mini");
        assert_eq!(DEFAULT_IMAGE_MODEL, "gpt-image-1");
    }

    #[test]
    fn test_socket_addr() {
        let config = FunctionsConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            gateway: GatewayConfig {
                base_url: "https://gateway.test/v1".to_string(),
                api_key: SecretString::from("gw-test-key"),
                chat_model: DEFAULT_CHAT_MODEL.to_string(),
                image_model: DEFAULT_IMAGE_MODEL.to_string(),
            },
            auth: AuthBackendConfig {
                base_url: "https://auth.test".to_string(),
            },
            scrape: ScrapeConfig {
                user_agent: DEFAULT_SCRAPE_USER_AGENT.to_string(),
                timeout_secs: 20,
                allowed_hosts: None,
            },
            storage: StorageConfig {
                base_url: "https://storage.test".to_string(),
                api_token: SecretString::from("st-test-token"),
                bucket: "media".to_string(),
                public_base_url: "https://cdn.test".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_allowed_hosts_parsing_trims_and_lowercases() {
        let hosts: Vec<String> = "Blog.Example.com, old.example.com ,"
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        assert_eq!(hosts, vec!["blog.example.com", "old.example.com"]);
    }

    #[test]
    fn test_gateway_config_debug_redacts_secrets() {
        let config = GatewayConfig {
            base_url: "https://gateway.test/v1".to_string(),
            api_key: SecretString::from("gw-super-sensitive-key"),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        };

        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("https://gateway.test/v1"));
        assert!(debug_output.contains(DEFAULT_CHAT_MODEL));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("gw-super-sensitive-key"));
    }

    #[test]
    fn test_storage_config_debug_redacts_secrets() {
        let config = StorageConfig {
            base_url: "https://storage.test".to_string(),
            api_token: SecretString::from("st-super-sensitive-token"),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.test".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("https://storage.test"));
        assert!(debug_output.contains("media"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("st-super-sensitive-token"));
    }
}
