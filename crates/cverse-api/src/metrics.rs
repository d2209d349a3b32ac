//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "cverse_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "cverse_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "cverse_http_requests_in_flight";

    // Upload grants
    pub const UPLOADS_ISSUED_TOTAL: &str = "cverse_uploads_issued_total";
    pub const UPLOADS_FAILED_TOTAL: &str = "cverse_uploads_failed_total";
    pub const UPLOAD_ORIGIN_REJECTED_TOTAL: &str = "cverse_upload_origin_rejected_total";

    // Webhooks
    pub const WEBHOOK_EVENTS_TOTAL: &str = "cverse_webhook_events_total";
    pub const WEBHOOK_SIGNATURE_FAILURES_TOTAL: &str = "cverse_webhook_signature_failures_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "cverse_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_upload_issued() {
    counter!(names::UPLOADS_ISSUED_TOTAL).increment(1);
}

/// Record a failed upload grant by error kind.
pub fn record_upload_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::UPLOADS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_origin_rejected() {
    counter!(names::UPLOAD_ORIGIN_REJECTED_TOTAL).increment(1);
}

/// Record a dispatched webhook event and how it ended.
pub fn record_webhook_event(event_type: &str, outcome: &str) {
    let labels = [
        ("type", event_type.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::WEBHOOK_EVENTS_TOTAL, &labels).increment(1);
}

pub fn record_signature_failure(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::WEBHOOK_SIGNATURE_FAILURES_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Labels by matched route so unknown paths collapse into one series.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
