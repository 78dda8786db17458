//! HTTP error mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crypto_session::CryptoError;
use exchange_protocol::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Error returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, too large or not the expected JSON
    #[error("Invalid request: {reason}")]
    InvalidRequest { status: StatusCode, reason: String },

    #[error("Invalid ECDH parameters: {0}")]
    InvalidPublicKey(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Too many active sessions")]
    TooManySessions,

    /// Covers malformed and unauthentic ciphertexts alike
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Decrypted payload is not valid UTF-8")]
    NotUtf8,

    #[error("Session error: {0}")]
    Session(CryptoError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { status, .. } => *status,
            ApiError::InvalidPublicKey(_) | ApiError::DecryptionFailed | ApiError::NotUtf8 => {
                StatusCode::BAD_REQUEST
            }
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::TooManySessions => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Session(CryptoError::SessionNotReady { .. })
            | ApiError::Session(CryptoError::ProtocolViolation(_)) => StatusCode::CONFLICT,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPublicKey(reason) => ApiError::InvalidPublicKey(reason),
            CryptoError::AuthenticationFailed | CryptoError::MalformedCiphertext(_) => {
                ApiError::DecryptionFailed
            }
            other => ApiError::Session(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest {
            status: rejection.status(),
            reason: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
