//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST/OPTIONS /uploads`: origin-checked direct-upload grants
//! - `POST /webhooks/video`: signature-verified asset event reconciliation
//! - Rate limiting, security headers and request ids
//! - Prometheus metrics and health probes

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::Reconciler;
pub use state::AppState;
