//! Shared data models for the Creator-Verse video backend.
//!
//! This crate provides Serde-serializable types for:
//! - Direct-upload grants issued by the video provider
//! - Provider webhook envelopes and asset payloads
//! - Application video records and their lifecycle status
//! - Playback/thumbnail URL derivation

pub mod asset;
pub mod event;
pub mod upload;
pub mod video;

// Re-export common types
pub use asset::{AssetData, AssetErrors, PlaybackId};
pub use event::{EventKind, WebhookEvent};
pub use upload::{PlaybackPolicy, UploadGrant, UploadGrantResponse};
pub use video::{playback_urls, PlaybackUrls, VideoId, VideoRecord, VideoStatus, VideoUpdate};
