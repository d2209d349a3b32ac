//! Asset payloads carried in `data` of asset webhooks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::upload::PlaybackPolicy;

/// Provider asset as reported by `video.asset.*` events.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetData {
    /// Provider-assigned asset id.
    pub id: String,
    /// Direct upload this asset was created from, if any.
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub passthrough: Option<String>,
    #[serde(default)]
    pub errors: Option<AssetErrors>,
}

impl AssetData {
    /// Primary playback id: the first public one, falling back to the first listed.
    pub fn primary_playback_id(&self) -> Option<&str> {
        self.playback_ids
            .iter()
            .find(|p| p.policy == Some(PlaybackPolicy::Public))
            .or_else(|| self.playback_ids.first())
            .map(|p| p.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlaybackId {
    pub id: String,
    #[serde(default)]
    pub policy: Option<PlaybackPolicy>,
}

/// Structured error list attached to errored assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssetErrors {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl AssetErrors {
    /// Human-readable summary for operators.
    pub fn summary(&self) -> String {
        let messages = self.messages.join("; ");
        match (&self.error_type, messages.is_empty()) {
            (Some(t), false) => format!("{}: {}", t, messages),
            (Some(t), true) => t.clone(),
            (None, false) => messages,
            (None, true) => "unknown error".to_string(),
        }
    }
}
