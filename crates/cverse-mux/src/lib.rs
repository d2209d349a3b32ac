//! Mux Video API client.
//!
//! This crate provides:
//! - Direct-upload creation (`POST /video/v1/uploads`)
//! - Webhook signature verification over raw request bytes
//! - The `UploadProvider` seam used by the API server

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod signature;

pub use client::MuxClient;
pub use config::MuxConfig;
pub use error::{MuxError, MuxResult};
pub use provider::{CreateUploadRequest, NewAssetSettings, UploadProvider};
pub use signature::{SignatureError, WebhookVerifier, DEFAULT_TOLERANCE, SIGNATURE_HEADER};
