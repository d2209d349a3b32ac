//! Application video records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Base URL for HLS playback.
pub const STREAM_BASE_URL: &str = "https://stream.mux.com";

/// Base URL for generated thumbnails.
pub const IMAGE_BASE_URL: &str = "https://image.mux.com";

/// Application-side identifier of a video record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a video as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Upload grant issued, nothing heard from the provider yet
    #[default]
    Pending,
    /// Asset created, provider is transcoding
    Processing,
    /// Asset playable
    Ready,
    /// Provider failed to process the upload
    Errored,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Errored => "errored",
        }
    }

    /// Parse the stored string form. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VideoStatus::Pending),
            "processing" => Some(VideoStatus::Processing),
            "ready" | "completed" => Some(VideoStatus::Ready),
            "errored" | "failed" => Some(VideoStatus::Errored),
            _ => None,
        }
    }

    /// No further provider events are expected in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Errored)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Video record persisted by the application store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    pub video_id: VideoId,
    pub upload_id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub playback_id: Option<String>,
    #[serde(default)]
    pub status: VideoStatus,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// New pending record for an issued upload.
    pub fn pending(video_id: impl Into<VideoId>, upload_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            upload_id: upload_id.into(),
            asset_id: None,
            playback_id: None,
            status: VideoStatus::Pending,
            duration: None,
            video_url: None,
            thumbnail_url: None,
            error_detail: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: &VideoUpdate) {
        if let Some(v) = &update.asset_id {
            self.asset_id = Some(v.clone());
        }
        if let Some(v) = &update.playback_id {
            self.playback_id = Some(v.clone());
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.duration {
            self.duration = Some(v);
        }
        if let Some(v) = &update.video_url {
            self.video_url = Some(v.clone());
        }
        if let Some(v) = &update.thumbnail_url {
            self.thumbnail_url = Some(v.clone());
        }
        if let Some(v) = &update.error_detail {
            self.error_detail = Some(v.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Partial field set written to a video record (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl VideoUpdate {
    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_status(mut self, status: VideoStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    /// Set the playback id together with the URLs derived from it.
    pub fn with_playback(mut self, playback_id: &str) -> Self {
        let urls = playback_urls(playback_id);
        self.playback_id = Some(playback_id.to_string());
        self.video_url = Some(urls.stream);
        self.thumbnail_url = Some(urls.thumbnail);
        self
    }

    pub fn with_error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == VideoUpdate::default()
    }
}

/// Public URLs for a playback id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlaybackUrls {
    pub stream: String,
    pub thumbnail: String,
}

/// Derive canonical stream and thumbnail URLs from a playback id.
pub fn playback_urls(playback_id: &str) -> PlaybackUrls {
    PlaybackUrls {
        stream: format!("{}/{}.m3u8", STREAM_BASE_URL, playback_id),
        thumbnail: format!(
            "{}/{}/thumbnail.jpg?width=640&height=360&fit_mode=preserve",
            IMAGE_BASE_URL, playback_id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_urls() {
        let urls = playback_urls("pb123");
        assert_eq!(urls.stream, "https://stream.mux.com/pb123.m3u8");
        assert_eq!(
            urls.thumbnail,
            "https://image.mux.com/pb123/thumbnail.jpg?width=640&height=360&fit_mode=preserve"
        );
    }

    #[test]
    fn test_status_round_trip_and_terminal() {
        for status in [
            VideoStatus::Pending,
            VideoStatus::Processing,
            VideoStatus::Ready,
            VideoStatus::Errored,
        ] {
            assert_eq!(VideoStatus::parse(status.as_str()), Some(status));
        }
        assert!(VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Errored.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert_eq!(VideoStatus::parse("bogus"), None);
    }

    #[test]
    fn test_apply_is_partial() {
        let mut record = VideoRecord::pending("vid-1", "up-1");
        record.apply(&VideoUpdate::default().with_asset_id("asset-1").with_status(VideoStatus::Processing));
        record.apply(&VideoUpdate::default().with_duration(Some(12.5)));

        assert_eq!(record.asset_id.as_deref(), Some("asset-1"));
        assert_eq!(record.status, VideoStatus::Processing);
        assert_eq!(record.duration, Some(12.5));
        assert_eq!(record.upload_id, "up-1");
    }

    #[test]
    fn test_with_playback_sets_derived_urls() {
        let update = VideoUpdate::default().with_playback("pb9");
        assert_eq!(update.playback_id.as_deref(), Some("pb9"));
        assert_eq!(update.video_url.as_deref(), Some("https://stream.mux.com/pb9.m3u8"));
        assert!(update.thumbnail_url.unwrap().starts_with("https://image.mux.com/pb9/"));
        assert!(VideoUpdate::default().is_empty());
    }
}
