//! API error types and JSON error response formatting.
//!
//! Every failing endpoint answers with the same `{error, message}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use admit_chat::ChatError;
use admit_core::AdmitError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    #[error("{0}")]
    BadRequest(String),
    /// 404 Not Found - unknown or expired session.
    #[error("{0}")]
    NotFound(String),
    /// 429 Too Many Requests.
    #[error("{0}")]
    TooManyRequests(String),
    /// 500 Internal Server Error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let body = ErrorBody {
            error: error_code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::SessionNotFound(id) => {
                ApiError::NotFound(format!("Session not found: {}", id))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AdmitError> for ApiError {
    fn from(err: AdmitError) -> Self {
        match err {
            AdmitError::RateLimited => ApiError::TooManyRequests("Rate limit exceeded".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::TooManyRequests("x".into()).into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_chat_error() {
        let err = ApiError::from(ChatError::SessionNotFound("abc".into()));
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("abc")));
        let err = ApiError::from(ChatError::LockPoisoned("boom".into()));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_from_admit_error() {
        assert!(matches!(
            ApiError::from(AdmitError::RateLimited),
            ApiError::TooManyRequests(_)
        ));
        assert!(matches!(
            ApiError::from(AdmitError::Config("bad".into())),
            ApiError::Internal(_)
        ));
    }
}
