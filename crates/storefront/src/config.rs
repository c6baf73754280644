//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `PAYPAL_CLIENT_ID` - `PayPal` REST app client ID
//! - `PAYPAL_CLIENT_SECRET` - `PayPal` REST app secret
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PAYPAL_MODE` - `sandbox` or `live` (default: sandbox)
//! - `SHIPPING_FEE` - Flat shipping fee in yen (default: 500)
//! - `SMTP_HOST` - SMTP relay; contact emails are disabled when unset
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - SMTP credentials
//! - `EMAIL_FROM` - Sender address (default: noreply@omoideuriba.com)
//! - `ADMIN_EMAIL` - Where contact notifications go (default: admin@omoideuriba.com)
//! - `ADMIN_BASE_URL` - Back-office URL used in notification links
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use omoide_core::{Email, Yen};
use secrecy::SecretString;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Payment processor credentials
    pub paypal: PayPalConfig,
    /// Flat shipping fee charged on every order
    pub shipping_fee: Yen,
    /// SMTP settings; `None` disables contact emails
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// `PayPal` environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    /// REST API base URL for this environment.
    #[must_use]
    pub const fn api_base(self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-m.sandbox.paypal.com",
            Self::Live => "https://api-m.paypal.com",
        }
    }
}

impl std::str::FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" | "production" => Ok(Self::Live),
            other => Err(format!("expected 'sandbox' or 'live', got '{other}'")),
        }
    }
}

/// `PayPal` REST credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayPalConfig {
    /// Client ID (also handed to the browser SDK)
    pub client_id: String,
    /// Client secret (server-side only)
    pub client_secret: SecretString,
    /// Sandbox or live
    pub mode: PayPalMode,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("mode", &self.mode)
            .finish()
    }
}

/// SMTP configuration for contact form emails.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Sender address on every outgoing message
    pub from_address: Email,
    /// Shop inbox that receives contact notifications
    pub admin_address: Email,
    /// Back-office base URL for links in notifications
    pub admin_url: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("admin_address", &self.admin_address)
            .field("admin_url", &self.admin_url)
            .finish()
    }
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

        let database_url = database_url("STOREFRONT_DATABASE_URL")?;
        let host: IpAddr = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port: u16 = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = require("STOREFRONT_BASE_URL")?;
        let session_secret = secret("STOREFRONT_SESSION_SECRET", MIN_SESSION_SECRET_LENGTH)?;

        let paypal = PayPalConfig::from_env()?;
        let shipping_fee = Yen::from_whole(parse_env::<u32>("SHIPPING_FEE", "500")?);
        let email = EmailConfig::from_env(&base_url)?;
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
            paypal,
            shipping_fee,
            email,
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

impl PayPalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require("PAYPAL_CLIENT_ID")?,
            client_secret: secret("PAYPAL_CLIENT_SECRET", 0)?,
            mode: parse_env("PAYPAL_MODE", "sandbox")?,
        })
    }
}

impl EmailConfig {
    fn from_env(base_url: &str) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = optional("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: require("SMTP_USERNAME")?,
            smtp_password: SecretString::from(require("SMTP_PASSWORD")?),
            from_address: parse_env("EMAIL_FROM", "noreply@omoideuriba.com")?,
            admin_address: parse_env("ADMIN_EMAIL", "admin@omoideuriba.com")?,
            admin_url: optional("ADMIN_BASE_URL").unwrap_or_else(|| base_url.to_string()),
        }))
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

/// Parse `key` (trimmed), or `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(key)
        .as_deref()
        .unwrap_or(default)
        .trim()
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

/// Load a secret, refusing short, sample or low-entropy values.
fn secret(key: &str, min_length: usize) -> Result<SecretString, ConfigError> {
    let value = require(key)?;
    check_secret(&value, min_length)
        .map_err(|reason| ConfigError::InsecureSecret(key.to_string(), reason))?;
    Ok(SecretString::from(value))
}

fn check_secret(value: &str, min_length: usize) -> Result<(), String> {
    let length = value.chars().count();
    if length < min_length {
        return Err(format!("must be at least {min_length} characters (got {length})"));
    }

    let lower = value.to_lowercase();
    if let Some(word) = SAMPLE_VALUE_WORDS.iter().find(|w| lower.contains(*w)) {
        return Err(format!("looks like a sample value (contains '{word}')"));
    }

    let bits = entropy_bits_per_char(value);
    if bits < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({bits:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); use a randomly generated value"
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

    fn paypal() -> PayPalConfig {
        PayPalConfig {
            client_id: "AZ-client-id".to_string(),
            client_secret: SecretString::from("paypal_client_secret_value"),
            mode: PayPalMode::Sandbox,
        }
    }

    #[test]
    fn test_entropy() {
        assert!(entropy_bits_per_char("").abs() < f64::EPSILON);
        assert!((entropy_bits_per_char("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_check_secret() {
        let strong = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";
        assert!(check_secret(strong, 0).is_ok());
        assert!(check_secret(strong, MIN_SESSION_SECRET_LENGTH).is_err());

        let sample = check_secret("your-paypal-client-value", 0).unwrap_err();
        assert!(sample.contains("your-"));

        let flat = check_secret(&"a".repeat(40), MIN_SESSION_SECRET_LENGTH).unwrap_err();
        assert!(flat.contains("entropy"));
    }

    #[test]
    fn test_paypal_mode_parsing() {
        assert_eq!("sandbox".parse::<PayPalMode>(), Ok(PayPalMode::Sandbox));
        assert_eq!("LIVE".parse::<PayPalMode>(), Ok(PayPalMode::Live));
        assert!("staging".parse::<PayPalMode>().is_err());
        assert_eq!(PayPalMode::Live.api_base(), "https://api-m.paypal.com");
        assert_eq!(
            PayPalMode::Sandbox.api_base(),
            "https://api-m.sandbox.paypal.com"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            paypal: paypal(),
            shipping_fee: Yen::from_whole(500),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", paypal());
        assert!(debug_output.contains("AZ-client-id"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("paypal_client_secret_value"));

        let email = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("smtp_password_value"),
            from_address: Email::parse("noreply@omoideuriba.com").unwrap(),
            admin_address: Email::parse("admin@omoideuriba.com").unwrap(),
            admin_url: "https://admin.omoideuriba.com".to_string(),
        };
        let debug_output = format!("{email:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(!debug_output.contains("smtp_password_value"));
    }
}
