//! API error type and its HTTP mapping.
//!
//! Every failure leaves the server as `{"error": CODE, "message": text}`.
//! Storage and hashing failures are logged in full and reported as a bare
//! `INTERNAL`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::auth::TokenError;
use caja_core::{CoreError, ValidationError};
use caja_db::{DbError, ServiceError};

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, query string or path.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            ApiError::Service(ServiceError::Core(err)) => core_parts(err),
            ApiError::Service(ServiceError::Db(err)) => db_parts(err),
            ApiError::Service(ServiceError::Password(_)) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        }
    }
}

fn core_parts(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::EmptyOrder => (StatusCode::BAD_REQUEST, "EMPTY_ORDER"),
        CoreError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
        CoreError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
        CoreError::ProductNotFound(_) | CoreError::SaleNotFound(_) | CoreError::UserNotFound(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
        CoreError::AccountDisabled => (StatusCode::UNAUTHORIZED, "ACCOUNT_DISABLED"),
        CoreError::AlreadyCanceled(_) => (StatusCode::CONFLICT, "ALREADY_CANCELED"),
    }
}

fn db_parts(err: &DbError) -> (StatusCode, &'static str) {
    match err {
        DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        DbError::UniqueViolation { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal server error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Invalid(_) => ApiError::Unauthorized("Invalid or malformed token".to_string()),
            TokenError::Encoding(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_code(err: impl Into<ApiError>) -> (StatusCode, &'static str) {
        err.into().parts()
    }

    #[test]
    fn test_domain_mapping() {
        assert_eq!(
            status_and_code(CoreError::InsufficientStock {
                code: "P".to_string(),
                available: 2,
                requested: 5,
            }),
            (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK")
        );
        assert_eq!(
            status_and_code(CoreError::EmptyOrder),
            (StatusCode::BAD_REQUEST, "EMPTY_ORDER")
        );
        assert_eq!(
            status_and_code(CoreError::SaleNotFound("s".to_string())),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            status_and_code(CoreError::forbidden("nope")),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
        assert_eq!(
            status_and_code(CoreError::AlreadyCanceled("V-1".to_string())),
            (StatusCode::CONFLICT, "ALREADY_CANCELED")
        );
        assert_eq!(
            status_and_code(CoreError::AccountDisabled),
            (StatusCode::UNAUTHORIZED, "ACCOUNT_DISABLED")
        );
    }

    #[test]
    fn test_storage_mapping() {
        assert_eq!(
            status_and_code(DbError::duplicate("products.code", "COCA-500")),
            (StatusCode::CONFLICT, "CONFLICT")
        );
        // Every invoice suffix drawn for the day was taken.
        assert_eq!(
            status_and_code(DbError::duplicate("sales.invoice_number", "FAC-20260101-777")),
            (StatusCode::CONFLICT, "CONFLICT")
        );
        assert_eq!(
            status_and_code(DbError::QueryFailed("disk I/O error".to_string())),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        );
        assert_eq!(
            status_and_code(TokenError::Expired),
            (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED")
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = ApiError::from(DbError::QueryFailed("secret table".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "INTERNAL");
        assert_eq!(json["message"], "Internal server error");
    }
}
