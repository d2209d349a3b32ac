//! API routes.

use std::sync::Arc;

use axum::http::Request;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::handlers::{
    create_upload, health, ready, receive_webhook, upload_preflight, uploads_method_not_allowed,
    webhooks_method_not_allowed,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    // Browser-facing; rate limited per client IP
    let upload_routes = Router::new()
        .route(
            "/uploads",
            post(create_upload)
                .options(upload_preflight)
                .fallback(uploads_method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    // Provider-facing; authenticated by signature, so no IP limits
    let webhook_routes = Router::new().route(
        "/webhooks/video",
        post(receive_webhook).fallback(webhooks_method_not_allowed),
    );

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || std::future::ready(handle.render()))),
        None => Router::new(),
    };

    // The webhook handler caps its own body after the secret check, so the
    // limit layer stays off that route.
    let limited_routes = Router::new()
        .merge(upload_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size));

    Router::new()
        .merge(limited_routes)
        .merge(webhook_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
