use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::services::store::StoreError;

#[derive(Error, Debug)]
pub enum PaystrataError {
    #[error("Missing transaction verification headers")]
    MissingVerificationHeaders,

    #[error("Transaction already processed")]
    TransactionAlreadyProcessed,

    #[error("Invalid transaction")]
    InvalidTransaction,

    #[error("Transaction not successful")]
    TransactionNotSuccessful,

    #[error("Transaction already used")]
    TransactionAlreadyUsed,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Too many requests, please try again later")]
    RateLimitExceeded,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl PaystrataError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaystrataError::MissingVerificationHeaders
            | PaystrataError::TransactionAlreadyProcessed
            | PaystrataError::InvalidTransaction
            | PaystrataError::TransactionNotSuccessful
            | PaystrataError::TransactionAlreadyUsed
            | PaystrataError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PaystrataError::Validation(_) => StatusCode::BAD_REQUEST,
            PaystrataError::NotFound(_) => StatusCode::NOT_FOUND,
            PaystrataError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            PaystrataError::Store(StoreError::Conflict(_)) => StatusCode::BAD_REQUEST,
            PaystrataError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PaystrataError::MissingVerificationHeaders => "MISSING_VERIFICATION_HEADERS",
            PaystrataError::TransactionAlreadyProcessed => "TRANSACTION_ALREADY_PROCESSED",
            PaystrataError::InvalidTransaction => "INVALID_TRANSACTION",
            PaystrataError::TransactionNotSuccessful => "TRANSACTION_NOT_SUCCESSFUL",
            PaystrataError::TransactionAlreadyUsed => "TRANSACTION_ALREADY_USED",
            PaystrataError::Unauthorized(_) => "UNAUTHORIZED",
            PaystrataError::Validation(_) => "VALIDATION_ERROR",
            PaystrataError::NotFound(_) | PaystrataError::Store(StoreError::NotFound(_)) => {
                "NOT_FOUND"
            }
            PaystrataError::Store(StoreError::Conflict(_)) => "CONFLICT",
            PaystrataError::Upstream(_) => "UPSTREAM_ERROR",
            PaystrataError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message returned to the caller. Internal failures are not echoed back.
    fn public_message(&self) -> String {
        match self {
            PaystrataError::Store(StoreError::NotFound(msg))
            | PaystrataError::Store(StoreError::Conflict(msg)) => msg.clone(),
            PaystrataError::Store(_) | PaystrataError::InternalError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for PaystrataError {
    fn from(rejection: JsonRejection) -> Self {
        PaystrataError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub status: bool,
    pub message: String,
    pub error_code: String,
    pub request_id: String,
}

impl IntoResponse for PaystrataError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let status = self.status_code();
        let error_code = self.error_code();

        let body = ErrorResponse {
            status: false,
            message: self.public_message(),
            error_code: error_code.to_string(),
            request_id: request_id.clone(),
        };

        if status.is_server_error() {
            tracing::error!(
                error = ?self,
                error_code = error_code,
                request_id = %request_id,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error = %self,
                error_code = error_code,
                request_id = %request_id,
                "Request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}
