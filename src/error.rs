use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::{APIResponse, ErrorBody};

pub type ApiResult<T> = Result<T, ApiError>;

const UNIQUE_VIOLATION: &str = "UNIQUE constraint failed";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ValidationError: {0}")]
    ValidationError(String),
    #[error("ConflictError: {0}")]
    ConflictError(String),
    #[error("NotFoundError: {0}")]
    NotFoundError(String),
    #[error("StorageError: {0:#}")]
    StorageError(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::ConflictError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFoundError(msg.into())
    }

    /// Maps a failed write to `ConflictError` when the store rejected it on a
    /// uniqueness constraint, so concurrent writers that slipped past the
    /// pre-check still get a 400 instead of a 500.
    pub fn from_write(err: libsql::Error, conflict_msg: &str) -> Self {
        if err.to_string().contains(UNIQUE_VIOLATION) {
            ApiError::ConflictError(conflict_msg.to_owned())
        } else {
            ApiError::StorageError(err.into())
        }
    }

    pub fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            ValidationError(_) | ConflictError(_) => StatusCode::BAD_REQUEST,
            NotFoundError(_) => StatusCode::NOT_FOUND,
            StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for ApiError {
    fn from(error: libsql::Error) -> Self {
        ApiError::StorageError(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;
        let status = self.status();
        let message = match self {
            ValidationError(msg) | ConflictError(msg) | NotFoundError(msg) => {
                tracing::info!(status = status.as_u16(), error = %msg, "request rejected");
                msg
            }
            StorageError(e) => {
                tracing::error!("storage failure: {e:#}");
                "internal server error".to_owned()
            }
        };

        (status, Json(APIResponse::failure(ErrorBody { error: message }))).into_response()
    }
}
