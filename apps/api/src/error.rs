//! Error types for the HTTP API.
//!
//! ```text
//! DbError / CoreError / ValidationError
//!        │
//!        ▼
//!    ApiError ──► status code + `{status, description: "error", data}`
//! ```
//!
//! Every error is logged here, once. Server-side failures keep their
//! message out of the response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use market_core::{CoreError, ValidationError};
use market_db::DbError;
use tracing::{error, warn};

use crate::response::Envelope;

/// Body sent in place of the real message on 5xx responses.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// A business rule rejected the operation (stock, shift or sale state).
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            CoreError::ProductNotFound { .. } => ApiError::NotFound(err.to_string()),
            CoreError::InsufficientStock { .. }
            | CoreError::LimitExceeded { .. }
            | CoreError::InvalidState { .. }
            | CoreError::PaymentRequired { .. }
            | CoreError::NoOpenRegister { .. }
            | CoreError::NoOpenShift { .. }
            | CoreError::ShiftAlreadyOpen { .. } => ApiError::Rejected(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::Validation("invalid reference to a missing record".to_string())
            }
            DbError::CheckViolation { .. } => ApiError::Validation(err.to_string()),
            DbError::Timeout { .. } => ApiError::Timeout(err.to_string()),
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let data = if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
            message
        };

        Envelope::new(status, data).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                DbError::not_found("Sale", "s1").into(),
                StatusCode::NOT_FOUND,
            ),
            (
                DbError::UniqueViolation {
                    constraint: "users.login".to_string(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                DbError::ForeignKeyViolation {
                    message: "FOREIGN KEY constraint failed".to_string(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                DbError::Timeout { after_ms: 2000 }.into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                DbError::PoolExhausted.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::ProductNotFound {
                    branch_id: "b1".to_string(),
                    barcode: "123".to_string(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                DbError::Rule(CoreError::NoOpenShift {
                    branch_id: "b1".to_string(),
                })
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ValidationError::Required {
                    field: "barcode".to_string(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Forbidden("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err:?}");
        }
    }

    #[test]
    fn test_wrapped_validation_keeps_its_message() {
        let err: ApiError = DbError::Rule(CoreError::Validation(ValidationError::Required {
            field: "income_product".to_string(),
        }))
        .into();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "income_product is required"));
    }

    #[tokio::test]
    async fn test_internal_message_is_suppressed() {
        let response = ApiError::Internal("disk I/O error at /var/db".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 500);
        assert_eq!(json["description"], "error");
        assert_eq!(json["data"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_error_carries_message() {
        let response = ApiError::NotFound("Sale s1 not found".to_string()).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["description"], "error");
        assert_eq!(json["data"], "Sale s1 not found");
    }
}
