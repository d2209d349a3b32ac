//! Firestore REST backend for video records.
//!
//! This crate provides:
//! - A slim Firestore REST client (structured queries, masked patches)
//! - Service account / metadata-server authentication via gcp_auth
//! - Emulator support through `FIRESTORE_EMULATOR_HOST`
//! - `FirestoreVideoStore`, the `VideoStore` implementation

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod video_store;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use video_store::FirestoreVideoStore;
