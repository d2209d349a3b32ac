//! `/webhooks/video`: signed provider event deliveries.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::{debug, error, warn};

use cverse_models::WebhookEvent;
use cverse_mux::{SignatureError, SIGNATURE_HEADER};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Body returned for every accepted delivery, handled or not.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub message: &'static str,
}

fn signature_failure_reason(err: &SignatureError) -> &'static str {
    match err {
        SignatureError::TimestampOutsideTolerance { .. } => "stale",
        SignatureError::Mismatch => "mismatch",
        _ => "malformed",
    }
}

/// `POST /webhooks/video`.
///
/// The body stays unread until the secret and signature header are known to
/// be present. It is then buffered up to `max_body_size` and the signature is
/// checked over exactly those bytes before any JSON decoding happens.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<Json<WebhookAck>> {
    let Some(verifier) = state.verifier.as_ref() else {
        error!("Webhook received but MUX_WEBHOOK_SECRET is not configured");
        return Err(ApiError::configuration("Webhook secret not configured."));
    };

    let Some(header) = headers.get(SIGNATURE_HEADER) else {
        warn!("Webhook delivery without signature header");
        metrics::record_signature_failure("missing");
        return Err(ApiError::validation("Signature missing."));
    };

    let body = to_bytes(body, state.config.max_body_size).await.map_err(|e| {
        warn!(error = %e, limit = state.config.max_body_size, "Failed to read webhook body");
        ApiError::payload_too_large(state.config.max_body_size)
    })?;

    let verified = header
        .to_str()
        .map_err(|_| SignatureError::MalformedHeader)
        .and_then(|header| verifier.verify(&body, header));
    if let Err(e) = verified {
        warn!(error = %e, body_len = body.len(), "Webhook signature verification failed");
        metrics::record_signature_failure(signature_failure_reason(&e));
        return Err(ApiError::validation(format!("Signature verification failed: {}", e)));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Verified webhook body is not a valid event envelope");
        ApiError::validation(format!("Invalid webhook payload: {}", e))
    })?;

    let kind = event.kind();
    debug!(event_type = %event.event_type, event_id = ?event.id, created_at = ?event.created_at, "Webhook event received");

    match state.reconciler.handle(&event).await {
        Ok(outcome) => {
            metrics::record_webhook_event(kind.as_str(), outcome.as_str());
            Ok(Json(WebhookAck {
                received: true,
                message: "Webhook processed.",
            }))
        }
        Err(e) => {
            error!(
                error = %e,
                event_type = %event.event_type,
                event_id = ?event.id,
                upload_id = ?event.data.get("upload_id"),
                "Failed to process webhook event"
            );
            metrics::record_webhook_event(kind.as_str(), "failed");
            Err(ApiError::processing(e.to_string(), !state.config.is_production()))
        }
    }
}

/// Any method other than POST on `/webhooks/video`.
pub async fn webhooks_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("POST")
}
