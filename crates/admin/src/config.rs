//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_CORS_ORIGIN` - Origin of the dashboard UI, if served from another host
//! - `LOW_STOCK_THRESHOLD` - Stock level at or below which a variant is flagged (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.1)
//!
//! ## Optional (media uploads - all of cloud name and preset, or neither)
//! - `MEDIA_CLOUD_NAME` - Cloudinary cloud name
//! - `MEDIA_UPLOAD_PRESET` - Unsigned upload preset
//! - `MEDIA_FOLDER` - Folder uploaded images land in
//! - `MEDIA_API_BASE` - API base URL (default: <https://api.cloudinary.com/v1_1>)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Default Cloudinary API base.
pub const DEFAULT_MEDIA_API_BASE: &str = "https://api.cloudinary.com/v1_1";

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Dashboard UI origin allowed by CORS
    pub cors_origin: Option<String>,
    /// Variants with stock at or below this are flagged on the dashboard
    pub low_stock_threshold: i32,
    /// Media host for image uploads (optional)
    pub media: Option<MediaConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Cloudinary upload configuration.
///
/// Implements `Debug` manually to redact the upload preset, which is enough
/// to upload to the account.
#[derive(Clone)]
pub struct MediaConfig {
    /// Cloud name, the account segment of the upload URL
    pub cloud_name: String,
    /// Unsigned upload preset
    pub upload_preset: SecretString,
    /// Destination folder
    pub folder: Option<String>,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("cloud_name", &self.cloud_name)
            .field("upload_preset", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl MediaConfig {
    /// Load media config. `None` when `MEDIA_CLOUD_NAME` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(cloud_name) = get_optional_env("MEDIA_CLOUD_NAME") else {
            return Ok(None);
        };
        let upload_preset = get_required_env("MEDIA_UPLOAD_PRESET")?;
        reject_placeholder(&upload_preset, "MEDIA_UPLOAD_PRESET")?;

        let api_base = get_env_or_default("MEDIA_API_BASE", DEFAULT_MEDIA_API_BASE);
        url::Url::parse(&api_base).map_err(|e| {
            ConfigError::InvalidEnvVar("MEDIA_API_BASE".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            cloud_name,
            upload_preset: SecretString::from(upload_preset),
            folder: get_optional_env("MEDIA_FOLDER"),
            api_base: api_base.trim_end_matches('/').to_string(),
        }))
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let cors_origin = get_optional_env("ADMIN_CORS_ORIGIN");
        if let Some(origin) = &cors_origin {
            url::Url::parse(origin).map_err(|e| {
                ConfigError::InvalidEnvVar("ADMIN_CORS_ORIGIN".to_string(), e.to_string())
            })?;
        }

        let low_stock_threshold = match get_optional_env("LOW_STOCK_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_LOW_STOCK_THRESHOLD,
        };

        Ok(Self {
            database_url,
            host,
            port,
            cors_origin,
            low_stock_threshold,
            media: MediaConfig::from_env()?,
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

/// Parse a non-negative low-stock threshold.
fn parse_threshold(raw: &str) -> Result<i32, ConfigError> {
    let threshold = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| ConfigError::InvalidEnvVar("LOW_STOCK_THRESHOLD".to_string(), e.to_string()))?;
    if threshold < 0 {
        return Err(ConfigError::InvalidEnvVar(
            "LOW_STOCK_THRESHOLD".to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(threshold)
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

/// Reject obvious placeholder values copied from a sample `.env`.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_placeholder() {
        let result = reject_placeholder("your-upload-preset", "MEDIA_UPLOAD_PRESET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));

        let result = reject_placeholder("CHANGEME", "MEDIA_UPLOAD_PRESET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));

        assert!(reject_placeholder("zolar_unsigned_v2", "MEDIA_UPLOAD_PRESET").is_ok());
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("10").unwrap(), 10);
        assert_eq!(parse_threshold(" 0 ").unwrap(), 0);
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("many").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            cors_origin: None,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            media: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_media_config_debug_redacts_preset() {
        let config = MediaConfig {
            cloud_name: "zolar".to_string(),
            upload_preset: SecretString::from("zolar_unsigned_v2"),
            folder: Some("products".to_string()),
            api_base: DEFAULT_MEDIA_API_BASE.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("zolar"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("zolar_unsigned_v2"));
    }
}
