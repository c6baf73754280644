//! `PayPal` Orders API client.
//!
//! # Architecture
//!
//! - Client-credentials exchange for a bearer token, cached in memory and
//!   refreshed shortly before it expires
//! - Orders are created for the server's quote, never the client's totals
//! - Captures send `PayPal-Request-Id` so a retried capture of the same order
//!   returns the original result instead of charging twice
//!
//! Only the calls the checkout needs are implemented: create, capture, get and
//! refund a capture.

pub mod auth;
pub mod client;
pub mod types;

pub use client::PayPalClient;
pub use types::{CaptureResult, OrderStatusResponse};

use thiserror::Error;

/// Errors that can occur when interacting with the `PayPal` API.
#[derive(Debug, Error)]
pub enum PayPalError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client-credentials exchange was refused.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}
