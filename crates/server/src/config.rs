//! Server configuration loaded from environment variables.
//!
//! Loading fails fast: the server refuses to start if anything required is
//! missing or malformed.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOCADO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BOCADO_BASE_URL` - Public URL the client is served from
//! - `BOCADO_SESSION_SECRET` - Session cookie signing secret (min 64 chars, high entropy)
//! - `RECOMMENDATION_WEBHOOK_TEST_URL` - Recommendation webhook for the test environment
//! - `RECOMMENDATION_WEBHOOK_PROD_URL` - Recommendation webhook for production
//!
//! ## Optional
//! - `BOCADO_HOST` - Bind address (default: 127.0.0.1)
//! - `BOCADO_PORT` - Listen port (default: 3000)
//! - `BOCADO_ENV` - `test` or `prod` (default: test); selects the webhook
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tower_sessions::cookie::Key;
use url::Url;

/// Cookie signing keys need 64 bytes of material.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Deployment environment; decides which recommendation webhook is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(format!("expected 'test' or 'prod', got '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => f.write_str("test"),
            Self::Prod => f.write_str("prod"),
        }
    }
}

/// Recommendation webhook endpoints, one per environment.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub test_url: Url,
    pub prod_url: Url,
}

impl WebhookConfig {
    /// The webhook the client should call in `environment`.
    #[must_use]
    pub const fn for_environment(&self, environment: Environment) -> &Url {
        match environment {
            Environment::Test => &self.test_url,
            Environment::Prod => &self.prod_url,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct BocadoConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Signs the session cookie
    pub session_key: SessionKey,
    pub environment: Environment,
    pub webhooks: WebhookConfig,
    pub sentry: SentryConfig,
}

/// Key derived from `BOCADO_SESSION_SECRET` that signs the session cookie.
#[derive(Clone)]
pub struct SessionKey(Key);

impl SessionKey {
    /// Build the signing key from a validated secret.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureSecret` if the secret is too short to
    /// serve as key material.
    pub fn from_secret(secret: &SecretString, var_name: &str) -> Result<Self, ConfigError> {
        Key::try_from(secret.expose_secret().as_bytes())
            .map(Self)
            .map_err(|e| ConfigError::InsecureSecret(var_name.to_string(), e.to_string()))
    }

    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl BocadoConfig {
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

        let database_url = get_database_url("BOCADO_DATABASE_URL")?;
        let host = parse_env("BOCADO_HOST", "127.0.0.1")?;
        let port = parse_env("BOCADO_PORT", "3000")?;
        let base_url = get_required_env("BOCADO_BASE_URL")?;
        let session_secret = get_validated_secret("BOCADO_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "BOCADO_SESSION_SECRET")?;
        let session_key = SessionKey::from_secret(&session_secret, "BOCADO_SESSION_SECRET")?;
        let environment = parse_env("BOCADO_ENV", "test")?;

        let webhooks = WebhookConfig {
            test_url: get_required_url("RECOMMENDATION_WEBHOOK_TEST_URL")?,
            prod_url: get_required_url("RECOMMENDATION_WEBHOOK_PROD_URL")?,
        };

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_key,
            environment,
            webhooks,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Recommendation webhook for the configured environment.
    #[must_use]
    pub const fn recommendation_webhook(&self) -> &Url {
        self.webhooks.for_environment(self.environment)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable that must be an absolute http(s) URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(key)?;
    parse_webhook_url(key, &raw)
}

fn parse_webhook_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url: Url = parse_value(key, raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.chars().count() as f64;
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS
        .iter()
        .find(|pattern| lower.contains(*pattern))
    {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

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
impl BocadoConfig {
    /// Fixed configuration for unit tests.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn for_tests(environment: Environment) -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/bocado"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_key: SessionKey::from_secret(&SecretString::from("x".repeat(64)), "TEST")
                .unwrap(),
            environment,
            webhooks: WebhookConfig {
                test_url: Url::parse("https://hooks.test.bocado.app/recommend").unwrap(),
                prod_url: Url::parse("https://hooks.bocado.app/recommend").unwrap(),
            },
            sentry: SentryConfig::default(),
        }
    }
}
