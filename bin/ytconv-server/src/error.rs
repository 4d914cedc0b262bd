//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** conversion and internal errors are logged with full
//! detail but only a generic message is returned to the caller so that
//! file paths, extractor command lines or stderr never leak to clients.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use ytconv_core::ServiceError;

/// All errors that can occur in the ytconv-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Metadata lookup failed; the extractor message is shown to the caller.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Conversion failed; the detail stays in the server log.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The client exhausted its request budget for the current window.
    #[error("too many requests")]
    RateLimited { retry_after: Duration },

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Extraction(m) => {
                error!(error = %m, "metadata extraction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
            }

            ServerError::RateLimited { retry_after } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "Too many requests" })),
                )
                    .into_response();
                let secs = retry_after.as_secs().max(1);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }

            // Internal errors: log the full detail, keep it private.
            ServerError::Conversion(m) => {
                error!(error = %m, "conversion failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Conversion failed".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<ServiceError> for ServerError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InvalidUrl | ServiceError::InvalidOption(_) => {
                ServerError::BadRequest(e.to_string())
            }
            ServiceError::Extraction(inner) => ServerError::Extraction(inner.to_string()),
            ServiceError::Conversion(inner) => ServerError::Conversion(inner.to_string()),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Internal(e.to_string())
    }
}
