//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the storefront UI (used for CORS)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_CURRENCY` - ISO 4217 currency code (default: EGP)
//! - `SHIPPING_FEE` - Flat shipping fee added to every order (default: 0)
//! - `REALTIME_URL` - Pub/sub relay endpoint for admin notifications
//! - `REALTIME_KEY` - Bearer key for the relay (required with `REALTIME_URL`)
//! - `REALTIME_SECRET` - HMAC signing secret (required with `REALTIME_URL`, high entropy)
//! - `REALTIME_CHANNEL` - Channel name (default: admin-notifications)
//! - `GA4_MEASUREMENT_ID` - Google Analytics 4 measurement ID
//! - `META_PIXEL_ID` - Meta (Facebook) pixel ID
//! - `TIKTOK_PIXEL_ID` - TikTok pixel ID
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;
use zolar_core::{CurrencyCode, Price};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default real-time channel for admin notifications.
pub const DEFAULT_REALTIME_CHANNEL: &str = "admin-notifications";

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the storefront UI
    pub base_url: String,
    /// Store currency
    pub currency: CurrencyCode,
    /// Flat shipping fee per order
    pub shipping_fee: Price,
    /// Real-time notification relay, if configured
    pub realtime: Option<RealtimeConfig>,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Pub/sub relay used to push order events to the admin dashboard.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Relay endpoint that accepts `{ channel, event, data }` JSON
    pub url: String,
    /// Bearer key for the relay
    pub key: SecretString,
    /// HMAC-SHA256 signing secret
    pub secret: SecretString,
    /// Channel the admin dashboard listens on
    pub channel: String,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("url", &self.url)
            .field("key", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Tracking pixel IDs handed to the UI for client-side injection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsConfig {
    /// Google Analytics 4 measurement ID
    pub ga4_measurement_id: Option<String>,
    /// Meta (Facebook) pixel ID
    pub meta_pixel_id: Option<String>,
    /// TikTok pixel ID
    pub tiktok_pixel_id: Option<String>,
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let currency = get_env_or_default("STORE_CURRENCY", "EGP")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e))?;
        let shipping_fee = Price::parse(&get_env_or_default("SHIPPING_FEE", "0"))
            .map_err(|e| ConfigError::InvalidEnvVar("SHIPPING_FEE".to_string(), e.to_string()))?;

        let realtime = RealtimeConfig::from_env()?;
        if realtime.is_none() {
            tracing::debug!("REALTIME_URL not set, admin notifications disabled");
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            currency,
            shipping_fee,
            realtime,
            analytics: AnalyticsConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RealtimeConfig {
    /// Load the relay config. `None` when `REALTIME_URL` is unset; once it is
    /// set, the key and secret become required.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(url) = get_optional_env("REALTIME_URL") else {
            return Ok(None);
        };
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("REALTIME_URL".to_string(), e.to_string()))?;

        Ok(Some(Self {
            url,
            key: SecretString::from(get_required_env("REALTIME_KEY")?),
            secret: get_validated_secret("REALTIME_SECRET")?,
            channel: get_env_or_default("REALTIME_CHANNEL", DEFAULT_REALTIME_CHANNEL),
        }))
    }
}

impl AnalyticsConfig {
    fn from_env() -> Self {
        Self {
            ga4_measurement_id: get_optional_env("GA4_MEASUREMENT_ID"),
            meta_pixel_id: get_optional_env("META_PIXEL_ID"),
            tiktok_pixel_id: get_optional_env("TIKTOK_PIXEL_ID"),
        }
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
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a 0.0-1.0 sample rate.
fn get_sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
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
