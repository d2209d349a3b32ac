//! `VideoStore` backed by a Firestore collection.
//!
//! Document layout (collection `videos` by default):
//!
//! | field           | type      |
//! |-----------------|-----------|
//! | `muxUploadId`   | string    |
//! | `muxAssetId`    | string    |
//! | `muxPlaybackId` | string    |
//! | `status`        | string    |
//! | `duration`      | double    |
//! | `videoUrl`      | string    |
//! | `thumbnailUrl`  | string    |
//! | `errorDetail`   | string    |
//! | `updatedAt`     | timestamp |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use cverse_models::{VideoId, VideoRecord, VideoStatus, VideoUpdate};
use cverse_store::{StoreError, StoreResult, VideoStore};

use crate::client::FirestoreClient;
use crate::types::{Document, StructuredQuery, ToFirestoreValue, Value};

pub const DEFAULT_COLLECTION: &str = "videos";

mod fields {
    pub const UPLOAD_ID: &str = "muxUploadId";
    pub const ASSET_ID: &str = "muxAssetId";
    pub const PLAYBACK_ID: &str = "muxPlaybackId";
    pub const STATUS: &str = "status";
    pub const DURATION: &str = "duration";
    pub const VIDEO_URL: &str = "videoUrl";
    pub const THUMBNAIL_URL: &str = "thumbnailUrl";
    pub const ERROR_DETAIL: &str = "errorDetail";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Firestore-backed video records.
#[derive(Clone)]
pub struct FirestoreVideoStore {
    client: FirestoreClient,
    collection: String,
}

impl FirestoreVideoStore {
    pub fn new(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// Build from `FIRESTORE_*` / `GCP_PROJECT_ID` environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        let client = FirestoreClient::from_env().await?;
        let collection = std::env::var("FIRESTORE_VIDEOS_COLLECTION")
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        Ok(Self::new(client, collection))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Only the fields present in `update`, plus `updatedAt`.
fn update_fields(update: &VideoUpdate) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    let mut put = |key: &str, value: Value| {
        out.insert(key.to_string(), value);
    };

    if let Some(v) = &update.asset_id {
        put(fields::ASSET_ID, v.to_firestore_value());
    }
    if let Some(v) = &update.playback_id {
        put(fields::PLAYBACK_ID, v.to_firestore_value());
    }
    if let Some(v) = update.status {
        put(fields::STATUS, v.as_str().to_firestore_value());
    }
    if let Some(v) = update.duration {
        put(fields::DURATION, v.to_firestore_value());
    }
    if let Some(v) = &update.video_url {
        put(fields::VIDEO_URL, v.to_firestore_value());
    }
    if let Some(v) = &update.thumbnail_url {
        put(fields::THUMBNAIL_URL, v.to_firestore_value());
    }
    if let Some(v) = &update.error_detail {
        put(fields::ERROR_DETAIL, v.to_firestore_value());
    }
    put(fields::UPDATED_AT, Utc::now().to_firestore_value());

    out
}

fn record_from_document(doc: &Document) -> StoreResult<VideoRecord> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::corrupt("<unnamed>", "document has no resource name"))?;

    let upload_id: String = doc
        .field(fields::UPLOAD_ID)
        .ok_or_else(|| StoreError::corrupt(id, "missing muxUploadId"))?;

    // Older documents may carry statuses this service never writes.
    let status = doc
        .field::<String>(fields::STATUS)
        .and_then(|s| VideoStatus::parse(&s))
        .unwrap_or_default();

    Ok(VideoRecord {
        video_id: VideoId::from(id),
        upload_id,
        asset_id: doc.field(fields::ASSET_ID),
        playback_id: doc.field(fields::PLAYBACK_ID),
        status,
        duration: doc.field(fields::DURATION),
        video_url: doc.field(fields::VIDEO_URL),
        thumbnail_url: doc.field(fields::THUMBNAIL_URL),
        error_detail: doc.field(fields::ERROR_DETAIL),
        updated_at: doc
            .field::<DateTime<Utc>>(fields::UPDATED_AT)
            .unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl VideoStore for FirestoreVideoStore {
    async fn find_by_upload_id(&self, upload_id: &str) -> StoreResult<Option<VideoRecord>> {
        let query = StructuredQuery::field_equals(&self.collection, fields::UPLOAD_ID, upload_id.to_firestore_value(), 1);
        let docs = self.client.run_query(query).await?;

        match docs.first() {
            Some(doc) => record_from_document(doc).map(Some),
            None => {
                debug!(upload_id = %upload_id, collection = %self.collection, "No video document for upload");
                Ok(None)
            }
        }
    }

    async fn update(&self, video_id: &VideoId, update: &VideoUpdate) -> StoreResult<()> {
        self.client
            .patch_document(&self.collection, video_id.as_str(), update_fields(update))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.ping().await.map_err(StoreError::from)
    }

    fn backend(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FirestoreConfig;
    use crate::retry::RetryConfig;
    use crate::token_cache::StaticTokenSource;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

    fn store_for(server: &MockServer) -> FirestoreVideoStore {
        let config = FirestoreConfig::new("demo")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_retry(RetryConfig::none());
        let client = FirestoreClient::with_token_source(config, Arc::new(StaticTokenSource::new("t"))).unwrap();
        FirestoreVideoStore::new(client, DEFAULT_COLLECTION)
    }

    #[test]
    fn test_update_fields_only_sets_present_values() {
        let update = VideoUpdate::default()
            .with_asset_id("asset_1")
            .with_status(VideoStatus::Processing);
        let out = update_fields(&update);

        assert_eq!(out.get("muxAssetId"), Some(&Value::StringValue("asset_1".into())));
        assert_eq!(out.get("status"), Some(&Value::StringValue("processing".into())));
        assert!(out.contains_key("updatedAt"));
        assert!(!out.contains_key("videoUrl"));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_record_from_document_tolerates_unknown_status() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/videos/vid-1",
            "fields": {
                "muxUploadId": {"stringValue": "up_1"},
                "status": {"stringValue": "waiting_for_upload"}
            }
        }))
        .unwrap();

        let record = record_from_document(&doc).unwrap();
        assert_eq!(record.video_id.as_str(), "vid-1");
        assert_eq!(record.upload_id, "up_1");
        assert_eq!(record.status, VideoStatus::Pending);
        assert!(record.asset_id.is_none());
    }

    #[test]
    fn test_record_without_upload_id_is_corrupt() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/videos/vid-1",
            "fields": {}
        }))
        .unwrap();
        assert!(matches!(record_from_document(&doc), Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_find_by_upload_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:runQuery", DOCS)))
            .and(body_partial_json(serde_json::json!({
                "structuredQuery": {"where": {"fieldFilter": {"value": {"stringValue": "up_9"}}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "document": {
                    "name": "projects/demo/databases/(default)/documents/videos/vid-9",
                    "fields": {
                        "muxUploadId": {"stringValue": "up_9"},
                        "status": {"stringValue": "processing"},
                        "muxAssetId": {"stringValue": "asset_9"}
                    }
                }
            }])))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let record = store.find_by_upload_id("up_9").await.unwrap().unwrap();
        assert_eq!(record.video_id.as_str(), "vid-9");
        assert_eq!(record.status, VideoStatus::Processing);
        assert_eq!(record.asset_id.as_deref(), Some("asset_9"));
    }

    #[tokio::test]
    async fn test_find_unknown_upload_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"readTime": "2026-01-01T00:00:00Z"}])))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.find_by_upload_id("up_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_patches_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/videos/vid-3", DOCS)))
            .and(query_param("updateMask.fieldPaths", "muxPlaybackId"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/demo/databases/(default)/documents/videos/vid-3"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let update = VideoUpdate::default()
            .with_status(VideoStatus::Ready)
            .with_playback("pb_3");
        store.update(&VideoId::from("vid-3"), &update).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_document_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store
            .update(&VideoId::from("gone"), &VideoUpdate::default().with_status(VideoStatus::Ready))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
