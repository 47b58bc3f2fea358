//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `UNIBAZAAR_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//! - `UNIBAZAAR_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `STORAGE_ENDPOINT` - Blob store gateway base URL
//! - `STORAGE_BUCKET` - Blob store bucket name
//! - `STORAGE_ACCESS_TOKEN` - Blob store bearer token
//! - `STORAGE_PUBLIC_BASE_URL` - Public base URL blobs are served from
//! - `PRICING_API_URL` - Price estimation service endpoint
//! - `PRICING_API_KEY` - Price estimation service API key
//!
//! ## Optional
//! - `UNIBAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `UNIBAZAAR_PORT` - Listen port (default: 8080)
//! - `UNIBAZAAR_CORS_ORIGIN` - Allowed CORS origin for the web frontend
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as a placeholder someone forgot to
/// replace (matched case-insensitively).
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` connection URL (contains the password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Blob store configuration
    pub storage: StorageConfig,
    /// Price estimation service configuration
    pub pricing: PricingConfig,
    /// Allowed CORS origin for the web frontend
    pub cors_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Blob store configuration.
///
/// `Debug` is written by hand so the access token never lands in a log.
#[derive(Clone)]
pub struct StorageConfig {
    /// Storage gateway base URL (server-side only)
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Bearer token for the gateway (server-side only)
    pub access_token: SecretString,
    /// Public base URL objects are served from
    pub public_base_url: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_token", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// Price estimation service configuration.
///
/// `Debug` is written by hand so the API key never lands in a log.
#[derive(Clone)]
pub struct PricingConfig {
    /// Estimation service endpoint
    pub api_url: String,
    /// Estimation service API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for PricingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from the environment, reading `.env` first if
    /// one is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or
    /// unparseable, or when the JWT secret looks like a placeholder or
    /// has too little entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = database_url("UNIBAZAAR_DATABASE_URL")?;
        let host = env_or("UNIBAZAAR_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("UNIBAZAAR_HOST".to_string(), e.to_string()))?;
        let port = env_or("UNIBAZAAR_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("UNIBAZAAR_PORT".to_string(), e.to_string()))?;

        let jwt_secret = signing_secret("UNIBAZAAR_JWT_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            storage: StorageConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
            cors_origin: optional_env("UNIBAZAAR_CORS_ORIGIN"),
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// The socket address the server binds.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: required_env("STORAGE_ENDPOINT")?,
            bucket: required_env("STORAGE_BUCKET")?,
            access_token: required_env("STORAGE_ACCESS_TOKEN").map(SecretString::from)?,
            public_base_url: required_env("STORAGE_PUBLIC_BASE_URL")?,
        })
    }
}

impl PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: required_env("PRICING_API_URL")?,
            api_key: required_env("PRICING_API_KEY").map(SecretString::from)?,
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Database URL from the app-specific variable, falling back to the
/// conventional `DATABASE_URL`.
fn database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Load the token signing secret and refuse weak values: too short,
/// placeholder-looking, or low-entropy.
fn signing_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required_env(key)?;

    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!(
                "must be at least {MIN_JWT_SECRET_LENGTH} characters (got {})",
                value.len()
            ),
        ));
    }

    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Shannon entropy in bits per character.
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

/// Reject placeholder-looking and low-entropy secrets.
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_of_degenerate_inputs() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        // A single repeated character carries no information.
        assert!((shannon_entropy("zzzzzzz") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_entropy_of_even_split() {
        // Two equally likely characters: one bit each.
        assert!((shannon_entropy("abababab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_entropy_of_random_secret() {
        assert!(shannon_entropy("fQ2#kN8@wX5!bM1$rT7&cJ4*") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholder_secrets_rejected() {
        for bad in ["your-signing-key-here", "changeme123", "jwt-secret-value"] {
            let result = validate_secret_strength(bad, "TEST_VAR");
            assert!(
                matches!(result, Err(ConfigError::InsecureSecret(_, _))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_strong_secret_accepted() {
        let result = validate_secret_strength("fQ2#kN8@wX5!bM1$rT7&cJ4*uG9^dZ6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_storage_config_debug_redacts_secrets() {
        let config = StorageConfig {
            endpoint: "https://storage.internal.example/v1".to_string(),
            bucket: "unibazaar".to_string(),
            access_token: SecretString::from("super_secret_access_token"),
            public_base_url: "https://cdn.unibazaar.example".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("unibazaar"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_access_token"));
    }

    #[test]
    fn test_pricing_config_debug_redacts_secrets() {
        let config = PricingConfig {
            api_url: "https://estimator.example/v1/suggest".to_string(),
            api_key: SecretString::from("super_secret_api_key"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("estimator.example"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
    }
}
