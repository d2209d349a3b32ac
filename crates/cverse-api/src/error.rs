//! API error types.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use cverse_mux::MuxError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing credentials or secrets. Never retried by callers.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing/malformed signature or body.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Method not allowed")]
    MethodNotAllowed { allow: &'static str },

    /// Provider call failed or returned unusable data.
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        details: serde_json::Value,
    },

    /// Work failed after a webhook was verified and dispatched.
    #[error("Processing error: {cause}")]
    Processing { cause: String, expose_cause: bool },
}

impl ApiError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::PayloadTooLarge { limit }
    }

    pub fn method_not_allowed(allow: &'static str) -> Self {
        Self::MethodNotAllowed { allow }
    }

    /// `expose_cause` puts the cause in the response `details`; keep it off in production.
    pub fn processing(cause: impl Into<String>, expose_cause: bool) -> Self {
        Self::Processing {
            cause: cause.into(),
            expose_cause,
        }
    }

    /// Upload-grant failure, keeping the provider's diagnostics.
    pub fn upstream(err: &MuxError) -> Self {
        let message = match err {
            MuxError::MalformedResponse { .. } => "Failed to create upload link.",
            _ => "Error creating upload.",
        };
        Self::Upstream {
            message: message.to_string(),
            details: err.details(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Configuration(_) | ApiError::Upstream { .. } | ApiError::Processing { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short category label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "configuration",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Validation(_) => "validation",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::MethodNotAllowed { .. } => "method",
            ApiError::Upstream { .. } => "upstream",
            ApiError::Processing { .. } => "processing",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::Configuration(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Validation(msg) => ErrorResponse {
                error: msg,
                details: None,
            },
            ApiError::PayloadTooLarge { .. } => ErrorResponse {
                error: "Request body too large.".to_string(),
                details: None,
            },
            ApiError::MethodNotAllowed { allow } => {
                let body = ErrorResponse {
                    error: "Method not allowed.".to_string(),
                    details: None,
                };
                let mut response = (status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static(allow));
                return response;
            }
            ApiError::Upstream { message, details } => ErrorResponse {
                error: message,
                details: Some(details),
            },
            ApiError::Processing { cause, expose_cause } => ErrorResponse {
                error: "Error processing webhook event.".to_string(),
                details: expose_cause.then_some(serde_json::Value::String(cause)),
            },
        };

        (status, Json(body)).into_response()
    }
}
