//! Upload provider seam.

use async_trait::async_trait;
use serde::Serialize;

use cverse_models::{PlaybackPolicy, UploadGrant};

use crate::error::MuxResult;

/// Settings applied to the asset created from a direct upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAssetSettings {
    pub playback_policy: Vec<PlaybackPolicy>,
}

/// Body of a direct-upload creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUploadRequest {
    /// Origin the browser will upload from; the provider enforces it on the upload URL.
    pub cors_origin: String,
    pub new_asset_settings: NewAssetSettings,
}

impl CreateUploadRequest {
    /// Upload from `cors_origin` producing a publicly playable asset.
    pub fn public(cors_origin: impl Into<String>) -> Self {
        Self {
            cors_origin: cors_origin.into(),
            new_asset_settings: NewAssetSettings {
                playback_policy: vec![PlaybackPolicy::Public],
            },
        }
    }
}

/// Something that can mint single-use direct-upload targets.
#[async_trait]
pub trait UploadProvider: Send + Sync {
    async fn create_upload(&self, request: &CreateUploadRequest) -> MuxResult<UploadGrant>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_request_body() {
        let body = serde_json::to_value(CreateUploadRequest::public("https://app.example.com")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "cors_origin": "https://app.example.com",
                "new_asset_settings": {"playback_policy": ["public"]}
            })
        );
    }
}
