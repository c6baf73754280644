//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as JSON: `{"error": "<message>", ...details}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::paypal::PayPalError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::validation::ValidationError;

const INTERNAL_MESSAGE: &str = "サーバーエラーが発生しました";
const PAYMENT_SERVICE_MESSAGE: &str = "決済サービスとの通信に失敗しました";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// `PayPal` API operation failed outside of checkout.
    #[error("PayPal error: {0}")]
    PayPal(#[from] PayPalError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not access the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {e}"))
    }
}

impl AppError {
    /// Status code and JSON body for this error.
    fn parts(&self) -> (StatusCode, Value) {
        match self {
            Self::Database(err) => repository_parts(err),
            Self::PayPal(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": PAYMENT_SERVICE_MESSAGE }),
            ),
            Self::Auth(err) => auth_parts(err),
            Self::Checkout(err) => checkout_parts(err),
            Self::Validation(err) => validation_parts(err),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "リクエストが多すぎます。しばらくしてから再度お試しください" }),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": INTERNAL_MESSAGE }),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(body)).into_response()
    }
}

fn repository_parts(err: &RepositoryError) -> (StatusCode, Value) {
    match err {
        RepositoryError::NotFound => (
            StatusCode::NOT_FOUND,
            json!({ "error": "見つかりません" }),
        ),
        RepositoryError::Conflict(message) => {
            (StatusCode::CONFLICT, json!({ "error": message }))
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": INTERNAL_MESSAGE }),
        ),
    }
}

fn validation_parts(err: &ValidationError) -> (StatusCode, Value) {
    (
        StatusCode::BAD_REQUEST,
        json!({
            "error": err.first_message(),
            "field": err.first_field(),
            "errors": err.errors,
        }),
    )
}

fn auth_parts(err: &AuthError) -> (StatusCode, Value) {
    let field_error = |status: StatusCode, message: &str, field: &str| {
        (status, json!({ "error": message, "field": field }))
    };

    match err {
        AuthError::InvalidEmail(_) => field_error(
            StatusCode::BAD_REQUEST,
            "有効なメールアドレスを入力してください",
            "email",
        ),
        AuthError::MissingFields => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "すべてのフィールドを入力してください" }),
        ),
        AuthError::NameTooLong => field_error(
            StatusCode::BAD_REQUEST,
            "名前は50文字以内で入力してください",
            "name",
        ),
        AuthError::WeakPassword(message) => {
            field_error(StatusCode::BAD_REQUEST, message, "password")
        }
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "メールアドレスまたはパスワードが正しくありません" }),
        ),
        AuthError::IncorrectPassword => field_error(
            StatusCode::BAD_REQUEST,
            "現在のパスワードが正しくありません",
            "currentPassword",
        ),
        AuthError::UserNotFound => (
            StatusCode::NOT_FOUND,
            json!({ "error": "ユーザーが見つかりません" }),
        ),
        AuthError::UserAlreadyExists => field_error(
            StatusCode::CONFLICT,
            "このメールアドレスは既に使用されています",
            "email",
        ),
        AuthError::Repository(err) => repository_parts(err),
        AuthError::PasswordHash => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": INTERNAL_MESSAGE }),
        ),
    }
}

fn checkout_parts(err: &CheckoutError) -> (StatusCode, Value) {
    match err {
        CheckoutError::Validation(err) => validation_parts(err),
        CheckoutError::ProductNotFound(product_id) => (
            StatusCode::NOT_FOUND,
            json!({ "error": err.to_string(), "productId": product_id }),
        ),
        CheckoutError::ProductInactive { product_id, .. } => (
            StatusCode::BAD_REQUEST,
            json!({ "error": err.to_string(), "productId": product_id }),
        ),
        CheckoutError::AmountMismatch(mismatch) => (
            StatusCode::BAD_REQUEST,
            json!({
                "error": "金額が一致しません",
                "calculated": mismatch.calculated,
                "received": mismatch.received,
            }),
        ),
        CheckoutError::InsufficientStock(unavailable) => (
            StatusCode::CONFLICT,
            json!({ "error": err.to_string(), "unavailableProducts": unavailable }),
        ),
        CheckoutError::PaymentNotCompleted { status } => (
            StatusCode::PAYMENT_REQUIRED,
            json!({ "error": "支払いが完了していません", "status": status }),
        ),
        CheckoutError::PaymentAlreadyUsed => (
            StatusCode::CONFLICT,
            json!({ "error": "この支払いは既に別の注文で使用されています" }),
        ),
        CheckoutError::PaymentAlreadyCaptured { paypal_order_id } => (
            StatusCode::CONFLICT,
            json!({
                "error": "この支払いは処理済みです。注文履歴をご確認ください",
                "paypalOrderId": paypal_order_id,
            }),
        ),
        CheckoutError::PayPal(_) => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": PAYMENT_SERVICE_MESSAGE }),
        ),
        CheckoutError::Repository(err) => repository_parts(err),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Capture requested", Some(&[("paypal_order_id", "5O19...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use omoide_core::ProductId;
    use omoide_core::inventory::StockRequest;
    use omoide_core::pricing::AmountMismatch;

    use super::*;
    use crate::db::inventory::StockCheck;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::PaymentAlreadyUsed)),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let err = ValidationError::single("shippingAddress.postalCode", "郵便番号が正しくありません");
        let (status, body) = render(AppError::Validation(err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "郵便番号が正しくありません");
        assert_eq!(body["field"], "shippingAddress.postalCode");
        assert_eq!(body["errors"][0]["field"], "shippingAddress.postalCode");
    }

    #[tokio::test]
    async fn test_amount_mismatch_body() {
        let err = CheckoutError::AmountMismatch(AmountMismatch {
            calculated: Decimal::new(2500, 0),
            received: Decimal::new(100, 0),
        });
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "金額が一致しません");
        assert_eq!(body["calculated"], "2500");
        assert_eq!(body["received"], "100");
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let check = StockCheck::new(
            StockRequest::new(ProductId::new(7), 3),
            Some((1, true)),
        );
        let err = CheckoutError::InsufficientStock(vec![check]);
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "在庫不足の商品があります");
        assert_eq!(body["unavailableProducts"][0]["productId"], 7);
        assert_eq!(body["unavailableProducts"][0]["available"], false);
    }

    #[tokio::test]
    async fn test_payment_not_completed_body() {
        let err = CheckoutError::PaymentNotCompleted {
            status: "PAYER_ACTION_REQUIRED".to_string(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["status"], "PAYER_ACTION_REQUIRED");
    }

    #[tokio::test]
    async fn test_already_captured_is_conflict() {
        let err = CheckoutError::PaymentAlreadyCaptured {
            paypal_order_id: "5O190127TN364715T".to_string(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["paypalOrderId"], "5O190127TN364715T");
        assert_eq!(body["error"], "この支払いは処理済みです。注文履歴をご確認ください");
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 42".to_string()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);

        let err = AppError::PayPal(PayPalError::AuthenticationFailed("401".to_string()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], PAYMENT_SERVICE_MESSAGE);
    }

    #[tokio::test]
    async fn test_incorrect_password_names_field() {
        let (status, body) = render(AuthError::IncorrectPassword.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "currentPassword");
    }
}
