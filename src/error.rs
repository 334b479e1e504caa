use crate::services::{BacktestError, StoreError};
use crate::types::SignalRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid signal: {0}")]
    Rejected(#[from] SignalRejection),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Rejected(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNAL"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Backtest(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BACKTEST_FAILED"),
            AppError::Internal(_) | AppError::Anyhow(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_maps_to_bad_request() {
        let err = AppError::from(SignalRejection::MissingDirection);
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_SIGNAL"));
        assert_eq!(err.to_string(), "Invalid signal: signal has no direction");
    }

    #[test]
    fn test_store_error_is_internal() {
        let err = AppError::from(StoreError::LockPoisoned);
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::NotFound("result 9".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
