//! Direct-upload grant models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Single-use upload destination minted by the video provider.
///
/// The client uploads raw bytes straight to `url`; `id` is the correlation
/// key that later shows up as `data.upload_id` on asset webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadGrant {
    pub url: String,
    pub id: String,
}

/// Wire shape returned to the frontend by `POST /uploads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrantResponse {
    pub upload_url: String,
    pub upload_id: String,
}

impl From<UploadGrant> for UploadGrantResponse {
    fn from(grant: UploadGrant) -> Self {
        Self {
            upload_url: grant.url,
            upload_id: grant.id,
        }
    }
}

/// Playback policy requested for the asset created from an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPolicy {
    #[default]
    Public,
    Signed,
    Drm,
    /// Policy names this service does not know yet.
    #[serde(other)]
    Other,
}

impl PlaybackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPolicy::Public => "public",
            PlaybackPolicy::Signed => "signed",
            PlaybackPolicy::Drm => "drm",
            PlaybackPolicy::Other => "other",
        }
    }
}
