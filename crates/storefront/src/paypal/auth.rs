//! `PayPal` OAuth client-credentials exchange.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::PayPalError;

/// Seconds before expiry at which a cached token is treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Bearer token for the `PayPal` REST API.
#[derive(Clone)]
pub struct AccessToken {
    pub token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Whether the token is expired or about to expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// Exchange client credentials for an access token.
///
/// # Errors
///
/// Returns `PayPalError::AuthenticationFailed` if `PayPal` rejects the
/// credentials, or `PayPalError::Http` if the request fails.
#[instrument(skip(client, client_secret))]
pub async fn fetch_token(
    client: &reqwest::Client,
    api_base: &str,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<AccessToken, PayPalError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{api_base}/v1/oauth2/token"))
        .basic_auth(client_id, Some(client_secret.expose_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(PayPalError::AuthenticationFailed(format!(
            "HTTP {status}: {error_text}"
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| PayPalError::Parse(e.to_string()))?;

    Ok(AccessToken {
        token: SecretString::from(body.access_token),
        expires_at: now + body.expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64) -> AccessToken {
        AccessToken {
            token: SecretString::from("A21AA".to_string()),
            expires_at,
        }
    }

    #[test]
    fn test_expiry_margin() {
        let t = token(1_000);
        assert!(!t.is_expired_at(939));
        assert!(t.is_expired_at(940));
        assert!(t.is_expired_at(2_000));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", token(0));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("A21AA"));
    }
}
