//! `PayPal` REST client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::instrument;

use omoide_core::pricing::Quote;

use super::PayPalError;
use super::auth::{AccessToken, fetch_token};
use super::types::{
    CaptureResponse, CaptureResult, CreateOrderRequest, ErrorResponse, OrderStatusResponse,
    RefundResponse,
};
use crate::config::PayPalConfig;

/// `PayPal` Orders API client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
#[derive(Clone)]
pub struct PayPalClient {
    inner: Arc<PayPalClientInner>,
}

struct PayPalClientInner {
    client: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: SecretString,
    /// Held across the token request so concurrent callers share one exchange.
    token: Mutex<Option<AccessToken>>,
}

impl PayPalClient {
    /// Create a client for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Http` if the HTTP client fails to build.
    pub fn new(config: &PayPalConfig) -> Result<Self, PayPalError> {
        Self::with_base_url(config, config.mode.api_base())
    }

    /// Create a client against an explicit API base URL.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Http` if the HTTP client fails to build.
    pub fn with_base_url(config: &PayPalConfig, api_base: &str) -> Result<Self, PayPalError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(PayPalClientInner {
                client,
                api_base: api_base.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: Mutex::new(None),
            }),
        })
    }

    /// Public client ID, handed to the browser SDK.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    async fn bearer_token(&self) -> Result<SecretString, PayPalError> {
        let mut cached = self.inner.token.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        tracing::debug!("Refreshing PayPal access token");
        let token = fetch_token(
            &self.inner.client,
            &self.inner.api_base,
            &self.inner.client_id,
            &self.inner.client_secret,
        )
        .await?;
        let secret = token.token.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PayPalError> {
        let token = self.bearer_token().await?;
        let response = request
            .bearer_auth(token.expose_secret())
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map_or(text, |e| e.summary());
            return Err(PayPalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PayPalError::Parse(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    /// Create an immediate-capture order for `quote`.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError` if authentication or the request fails.
    #[instrument(skip(self, quote), fields(total = %quote.total()))]
    pub async fn create_order(&self, quote: &Quote) -> Result<OrderStatusResponse, PayPalError> {
        let body = CreateOrderRequest::for_quote(quote);
        let request = self
            .inner
            .client
            .post(self.url("/v2/checkout/orders"))
            .json(&body);
        let order: OrderStatusResponse = self.send(request).await?;
        tracing::info!(paypal_order_id = %order.id, status = %order.status, "PayPal order created");
        Ok(order)
    }

    /// Capture an approved order.
    ///
    /// Capturing the same order again returns the first capture's result.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError` if authentication or the request fails, including
    /// when `PayPal` declines the payment.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, paypal_order_id: &str) -> Result<CaptureResult, PayPalError> {
        let request = self
            .inner
            .client
            .post(self.url(&format!("/v2/checkout/orders/{paypal_order_id}/capture")))
            .header("PayPal-Request-Id", format!("capture-{paypal_order_id}"))
            .json(&serde_json::json!({}));
        let response: CaptureResponse = self.send(request).await?;
        let result = CaptureResult::from(response);
        tracing::info!(
            paypal_order_id = %result.order_id,
            status = %result.status,
            capture_id = ?result.capture_id,
            "PayPal order captured"
        );
        Ok(result)
    }

    /// Look up an order's current status.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError` if authentication or the request fails.
    #[instrument(skip(self))]
    pub async fn get_order(&self, paypal_order_id: &str) -> Result<OrderStatusResponse, PayPalError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("/v2/checkout/orders/{paypal_order_id}")));
        self.send(request).await
    }

    /// Refund a capture in full.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError` if authentication or the request fails.
    #[instrument(skip(self))]
    pub async fn refund_capture(&self, capture_id: &str) -> Result<String, PayPalError> {
        let request = self
            .inner
            .client
            .post(self.url(&format!("/v2/payments/captures/{capture_id}/refund")))
            .header("PayPal-Request-Id", format!("refund-{capture_id}"))
            .json(&serde_json::json!({}));
        let refund: RefundResponse = self.send(request).await?;
        tracing::warn!(refund_id = %refund.id, status = %refund.status, "PayPal capture refunded");
        Ok(refund.status)
    }
}
