//! Mux client error types.

use thiserror::Error;

/// Result type for Mux operations.
pub type MuxResult<T> = Result<T, MuxError>;

/// Errors that can occur while talking to the Mux API.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Mux client not configured: {0}")]
    Config(String),

    #[error("Mux API returned {status}: {}", messages.join(", "))]
    Api { status: u16, messages: Vec<String> },

    #[error("Malformed Mux response: {reason}")]
    MalformedResponse {
        reason: String,
        body: serde_json::Value,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MuxError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(reason: impl Into<String>, body: serde_json::Value) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            body,
        }
    }

    /// Diagnostic payload suitable for an error envelope's `details`.
    pub fn details(&self) -> serde_json::Value {
        match self {
            MuxError::Api { messages, .. } => serde_json::Value::String(messages.join(", ")),
            MuxError::MalformedResponse { body, .. } => body.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }

    /// HTTP status reported by Mux, if the request got that far.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            MuxError::Api { status, .. } => Some(*status),
            MuxError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
