//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the back-office
//! - `ADMIN_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `AWS_S3_BUCKET` - Bucket for product images; uploads are disabled when unset
//! - `AWS_S3_REGION` - Bucket region (default: us-east-1)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! AWS credentials are read by `aws-config` from the usual
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` chain.

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Fragments that give away a value copied from a sample `.env`.
const SAMPLE_VALUE_WORDS: [&str; 10] = [
    "changeme",
    "change-me",
    "placeholder",
    "example",
    "secret",
    "password",
    "replace",
    "your-",
    "xxx",
    "todo",
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
    /// Public base URL for the back-office
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Image bucket; `None` disables `/api/upload`
    pub storage: Option<StorageConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// S3 bucket holding product images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

impl StorageConfig {
    /// Public URL of an object in this bucket.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{key}",
            self.bucket, self.region
        )
    }
}

impl AdminConfig {
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

        let database_url = database_url("ADMIN_DATABASE_URL")?;
        let host: IpAddr = parse_env("ADMIN_HOST", "127.0.0.1")?;
        let port: u16 = parse_env("ADMIN_PORT", "3001")?;
        let base_url = require("ADMIN_BASE_URL")?;
        let session_secret = session_secret("ADMIN_SESSION_SECRET")?;

        let storage = optional("AWS_S3_BUCKET").map(|bucket| StorageConfig {
            bucket,
            region: optional("AWS_S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
        });

        let sentry_dsn = optional("SENTRY_DSN");
        let sentry_environment = optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
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
}

// =============================================================================
// Environment
// =============================================================================

/// A set, non-blank variable.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse `key`, or `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(key)
        .as_deref()
        .unwrap_or(default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// `key`, falling back to the `DATABASE_URL` set by `fly postgres attach`.
fn database_url(key: &str) -> Result<SecretString, ConfigError> {
    optional(key)
        .or_else(|| optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Load a session signing secret, refusing short, sample or low-entropy values.
fn session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = require(key)?;
    check_secret(&value).map_err(|reason| ConfigError::InsecureSecret(key.to_string(), reason))?;
    Ok(SecretString::from(value))
}

fn check_secret(value: &str) -> Result<(), String> {
    let length = value.chars().count();
    if length < MIN_SESSION_SECRET_LENGTH {
        return Err(format!(
            "must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = value.to_lowercase();
    if let Some(word) = SAMPLE_VALUE_WORDS.iter().find(|w| lower.contains(*w)) {
        return Err(format!("looks like a sample value (contains '{word}')"));
    }

    let bits = entropy_bits_per_char(value);
    if bits < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({bits:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate it with `openssl rand -base64 48`"
        ));
    }
    Ok(())
}

/// Shannon entropy of `value`, in bits per character.
fn entropy_bits_per_char(value: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let total = f64::from(counts.values().sum::<u32>());
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_secret_rejects_short() {
        let err = check_secret("Qm7#vR2$kP9!").unwrap_err();
        assert!(err.contains("at least 32"));
    }

    #[test]
    fn test_check_secret_rejects_sample_values() {
        let err = check_secret("changeme-changeme-changeme-changeme").unwrap_err();
        assert!(err.contains("changeme"));
    }

    #[test]
    fn test_check_secret_rejects_low_entropy() {
        let err = check_secret("abababababababababababababababab").unwrap_err();
        assert!(err.contains("entropy"));
    }

    #[test]
    fn test_check_secret_accepts_random_value() {
        assert!(check_secret("Qm7#vR2$kP9!tX4@wZ6&nB1*yD8^hF3%").is_ok());
    }

    #[test]
    fn test_entropy() {
        assert!(entropy_bits_per_char("").abs() < f64::EPSILON);
        assert!((entropy_bits_per_char("abab") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_public_url() {
        let storage = StorageConfig {
            bucket: "omoide-images".to_string(),
            region: "ap-northeast-1".to_string(),
        };
        assert_eq!(
            storage.public_url("products/1-abc-cat.png"),
            "https://omoide-images.s3.ap-northeast-1.amazonaws.com/products/1-abc-cat.png"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            storage: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.port(), 3001);
        assert!(format!("{config:?}").contains("localhost:3001"));
    }
}
