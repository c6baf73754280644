//! In-process stand-in for the `PayPal` REST API.
//!
//! Serves the token, capture, order lookup and refund endpoints the checkout
//! calls, on an ephemeral local port. Capture replies are queued per test and
//! every refund request is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Notify;

use omoide_storefront::config::{PayPalConfig, PayPalMode};
use omoide_storefront::paypal::{PayPalClient, PayPalError};

/// How the next capture request is answered.
#[derive(Debug, Clone)]
pub enum CaptureReply {
    /// `COMPLETED` with one capture of `amount` yen.
    Completed { amount: String },
    /// 422 `ORDER_NOT_APPROVED`.
    NotApproved,
    /// 422 `ORDER_ALREADY_CAPTURED`.
    AlreadyCaptured,
    /// 422 `ORDER_ALREADY_CAPTURED`, sent only after [`PayPalStub::release`].
    AlreadyCapturedOnRelease,
}

#[derive(Default)]
struct Ledger {
    replies: VecDeque<CaptureReply>,
    order_status: String,
    captures: usize,
    refunds: Vec<String>,
}

#[derive(Clone)]
struct Shared {
    ledger: Arc<Mutex<Ledger>>,
    arrived: Arc<Notify>,
    gate: Arc<Notify>,
}

impl Shared {
    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ledger)
    }
}

/// A running stub; dropped with the test runtime.
pub struct PayPalStub {
    base_url: String,
    shared: Shared,
}

impl PayPalStub {
    /// Bind to a free local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let shared = Shared {
            ledger: Arc::new(Mutex::new(Ledger {
                order_status: "COMPLETED".to_owned(),
                ..Ledger::default()
            })),
            arrived: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        };

        let app = Router::new()
            .route("/v1/oauth2/token", post(token))
            .route("/v2/checkout/orders/{id}", get(order))
            .route("/v2/checkout/orders/{id}/capture", post(capture))
            .route("/v2/payments/captures/{id}/refund", post(refund))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shared,
        })
    }

    /// A client pointed at this stub.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn client(&self) -> Result<PayPalClient, PayPalError> {
        let config = PayPalConfig {
            client_id: "stub-client".to_owned(),
            client_secret: SecretString::from("stub-secret"),
            mode: PayPalMode::Sandbox,
        };
        PayPalClient::with_base_url(&config, &self.base_url)
    }

    /// Queue the answer to the next capture request.
    pub fn reply_to_capture(&self, reply: CaptureReply) {
        self.shared.with_ledger(|l| l.replies.push_back(reply));
    }

    /// Status returned by the order lookup endpoint.
    pub fn set_order_status(&self, status: &str) {
        self.shared.with_ledger(|l| status.clone_into(&mut l.order_status));
    }

    /// Wait until a capture request has arrived.
    pub async fn capture_arrived(&self) {
        self.shared.arrived.notified().await;
    }

    /// Let a held capture reply go out.
    pub fn release(&self) {
        self.shared.gate.notify_one();
    }

    /// Number of capture requests received.
    #[must_use]
    pub fn captures(&self) -> usize {
        self.shared.with_ledger(|l| l.captures)
    }

    /// Capture ids refunded, in request order.
    #[must_use]
    pub fn refunds(&self) -> Vec<String> {
        self.shared.with_ledger(|l| l.refunds.clone())
    }
}

/// Capture id the stub assigns to a `PayPal` order.
#[must_use]
pub fn capture_id_for(paypal_order_id: &str) -> String {
    format!("CAP-{paypal_order_id}")
}

async fn token() -> Json<Value> {
    Json(json!({ "access_token": "stub-token", "token_type": "Bearer", "expires_in": 32_400 }))
}

async fn order(State(shared): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let status = shared.with_ledger(|l| l.order_status.clone());
    Json(json!({ "id": id, "status": status }))
}

async fn capture(State(shared): State<Shared>, Path(id): Path<String>) -> Response {
    let reply = shared.with_ledger(|l| {
        l.captures += 1;
        l.replies.pop_front()
    });
    shared.arrived.notify_one();

    match reply {
        Some(CaptureReply::Completed { amount }) => Json(json!({
            "id": id,
            "status": "COMPLETED",
            "purchase_units": [{
                "payments": {
                    "captures": [{
                        "id": capture_id_for(&id),
                        "status": "COMPLETED",
                        "amount": { "currency_code": "JPY", "value": amount },
                    }]
                }
            }],
        }))
        .into_response(),
        Some(CaptureReply::NotApproved) => unprocessable("ORDER_NOT_APPROVED"),
        Some(CaptureReply::AlreadyCaptured) => unprocessable("ORDER_ALREADY_CAPTURED"),
        Some(CaptureReply::AlreadyCapturedOnRelease) => {
            shared.gate.notified().await;
            unprocessable("ORDER_ALREADY_CAPTURED")
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "name": "INTERNAL_SERVER_ERROR", "message": "no capture reply queued" })),
        )
            .into_response(),
    }
}

async fn refund(State(shared): State<Shared>, Path(capture_id): Path<String>) -> Json<Value> {
    let refund_id = shared.with_ledger(|l| {
        l.refunds.push(capture_id);
        format!("REF-{}", l.refunds.len())
    });
    Json(json!({ "id": refund_id, "status": "COMPLETED" }))
}

fn unprocessable(issue: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "name": "UNPROCESSABLE_ENTITY",
            "message": "The requested action could not be performed.",
            "details": [{ "issue": issue }],
        })),
    )
        .into_response()
}
