//! `/uploads`: direct-upload grants for the browser.

use axum::extract::State;
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, warn};

use cverse_models::{UploadGrant, UploadGrantResponse};
use cverse_mux::CreateUploadRequest;

use crate::cors::{AllowedOrigin, ALLOWED_METHODS};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(ORIGIN).and_then(|v| v.to_str().ok())
}

/// `POST /uploads` → `201 { uploadUrl, uploadId }`.
pub async fn create_upload(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let origin = request_origin(&headers);
    let allowed = state.cors.check(origin);
    let cors = state.cors.headers(allowed.as_ref());

    match issue_grant(&state, origin, allowed).await {
        Ok(grant) => {
            metrics::record_upload_issued();
            (StatusCode::CREATED, cors, Json(UploadGrantResponse::from(grant))).into_response()
        }
        Err(e) => {
            metrics::record_upload_failed(e.kind());
            (cors, e).into_response()
        }
    }
}

async fn issue_grant(state: &AppState, origin: Option<&str>, allowed: Option<AllowedOrigin>) -> ApiResult<UploadGrant> {
    let Some(allowed) = allowed else {
        warn!(origin = ?origin, "Upload grant refused for origin");
        metrics::record_origin_rejected();
        return Err(ApiError::forbidden("Origin not allowed."));
    };

    let Some(provider) = state.uploads.as_ref() else {
        error!("Upload requested but the video provider is not configured");
        return Err(ApiError::configuration("Video provider not configured."));
    };

    let request = CreateUploadRequest::public(allowed.cors_origin());
    match provider.create_upload(&request).await {
        Ok(grant) => {
            info!(upload_id = %grant.id, cors_origin = %request.cors_origin, "Issued upload grant");
            Ok(grant)
        }
        Err(e) => {
            error!(error = %e, details = %e.details(), cors_origin = %request.cors_origin, "Failed to create upload");
            Err(ApiError::upstream(&e))
        }
    }
}

/// `OPTIONS /uploads`: CORS preflight. Never touches the provider.
pub async fn upload_preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let allowed = state.cors.check(request_origin(&headers));
    (StatusCode::OK, state.cors.headers(allowed.as_ref())).into_response()
}

/// Any other method on `/uploads`.
pub async fn uploads_method_not_allowed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let allowed = state.cors.check(request_origin(&headers));
    (
        state.cors.headers(allowed.as_ref()),
        ApiError::method_not_allowed(ALLOWED_METHODS),
    )
        .into_response()
}
