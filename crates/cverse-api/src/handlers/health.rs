//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: CheckStatus,
    pub upload_provider: CheckStatus,
    pub webhook_secret: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(detail: Option<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: "ok",
            detail,
            latency_ms,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error",
            detail: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn configured(present: bool) -> Self {
        if present {
            Self::ok(None, None)
        } else {
            Self {
                status: "missing",
                detail: None,
                latency_ms: None,
            }
        }
    }
}

/// Readiness probe. Fails only when the store is unreachable; missing
/// provider credentials are reported but don't take the instance out.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let start = Instant::now();
    let store = match state.store.ping().await {
        Ok(()) => CheckStatus::ok(
            Some(state.store.backend().to_string()),
            Some(start.elapsed().as_millis() as u64),
        ),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    let store_ok = store.status == "ok";
    let response = ReadinessResponse {
        status: if store_ok { "ready" } else { "unavailable" },
        checks: ReadinessChecks {
            store,
            upload_provider: CheckStatus::configured(state.uploads.is_some()),
            webhook_secret: CheckStatus::configured(state.verifier.is_some()),
        },
    };

    if store_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
