//! Error taxonomy shared by the storage gateway, the auth gate and the services.
//!
//! `StorageError` is what a backend reports; `AppError` is what a request
//! handler returns and what ends up in the `{error, message}` body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Failure reported by a storage backend.
///
/// Zero matched rows is never an error here; gateways return `None`/`false`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport, connection or pool failure. The caller may retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Constraint violation or malformed write. Retrying will not help.
    #[error("storage rejected the operation: {0}")]
    Rejected(String),
    /// The store answered but the payload could not be decoded.
    #[error("malformed storage response: {0}")]
    Decode(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Request-level error; every variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error category, e.g. `NotFound`.
    pub error: String,
    /// Human readable explanation.
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Storage(StorageError::Unavailable(_)) => "StorageUnavailable",
            AppError::Storage(StorageError::Rejected(_)) => "StorageRejected",
            AppError::Storage(StorageError::Decode(_)) | AppError::Internal(_) => "Internal",
        }
    }

    /// Client-facing text. Storage and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthenticated(err) => err.public_message().to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(entity) => format!("{entity} not found"),
            AppError::Storage(StorageError::Unavailable(_)) => {
                "Storage is temporarily unavailable".to_string()
            }
            AppError::Storage(StorageError::Rejected(_)) => {
                "Storage rejected the operation".to_string()
            }
            AppError::Storage(StorageError::Decode(_)) | AppError::Internal(_) => {
                "Unexpected server error".to_string()
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.category().to_string(),
            message: self.public_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(category = self.category(), error = %self, "request failed");
        } else {
            tracing::debug!(category = self.category(), error = %self, "request rejected");
        }

        let body = Json(self.body());
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_categories_and_statuses() {
        let unavailable = AppError::from(StorageError::Unavailable("connection refused".into()));
        assert_eq!(unavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unavailable.category(), "StorageUnavailable");

        let rejected = AppError::from(StorageError::Rejected("violates check".into()));
        assert_eq!(rejected.category(), "StorageRejected");

        let decode = AppError::from(StorageError::Decode("expected array".into()));
        assert_eq!(decode.category(), "Internal");

        assert!(StorageError::Unavailable(String::new()).is_retryable());
        assert!(!StorageError::Rejected(String::new()).is_retryable());
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = AppError::from(StorageError::Rejected(
            "duplicate key value violates unique constraint \"tabs_pkey\"".into(),
        ));
        let body = err.body();
        assert_eq!(body.error, "StorageRejected");
        assert!(!body.message.contains("tabs_pkey"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = AppError::InvalidInput("At least one tab is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().message, "At least one tab is required");

        let err = AppError::NotFound("Workspace");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().message, "Workspace not found");
    }
}
