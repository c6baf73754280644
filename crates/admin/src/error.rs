//! Unified error handling with Sentry integration.
//!
//! Every error renders as JSON: `{"error": "<message>", ...details}`.
//! Server errors are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AdminAuthError, StorageError};
use crate::validation::ValidationError;

const INTERNAL_MESSAGE: &str = "サーバーエラーが発生しました";

/// Application-level error type for the back-office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// Object storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Not logged in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in without the ADMIN role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A feature needs configuration that is missing.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

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
    fn parts(&self) -> (StatusCode, Value) {
        match self {
            Self::Database(err) => repository_parts(err),
            Self::Auth(AdminAuthError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "メールアドレスまたはパスワードが正しくありません" }),
            ),
            Self::Auth(AdminAuthError::NotAdmin) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "管理者権限が必要です" }),
            ),
            Self::Auth(AdminAuthError::Repository(err)) => repository_parts(err),
            Self::Storage(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "アップロードURLの生成に失敗しました" }),
            ),
            Self::Validation(err) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": err.first_message(),
                    "field": err.first_field(),
                    "errors": err.errors,
                }),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": message }),
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
        RepositoryError::InvalidTransition(t) => (
            StatusCode::CONFLICT,
            json!({
                "error": format!(
                    "ステータスを「{}」から「{}」に変更することはできません",
                    t.from.admin_label(),
                    t.to.admin_label()
                ),
                "from": t.from,
                "to": t.to,
                "allowed": t.from.next_statuses(),
            }),
        ),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": INTERNAL_MESSAGE }),
        ),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
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
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use omoide_core::{InvalidTransition, OrderStatus};

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        fn status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            status(AppError::Unauthorized("x".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AppError::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(AppError::Auth(AdminAuthError::NotAdmin)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(AppError::Auth(AdminAuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AppError::Unavailable("x".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_body() {
        let err = RepositoryError::InvalidTransition(InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        });
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["error"],
            "ステータスを「発送済み」から「キャンセル」に変更することはできません"
        );
        assert_eq!(body["from"], "SHIPPED");
        assert_eq!(body["allowed"], json!(["DELIVERED"]));
    }

    #[tokio::test]
    async fn test_conflict_keeps_message() {
        let err = RepositoryError::Conflict("このスラッグは既に使用されています".to_string());
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "このスラッグは既に使用されています");
    }
}
