//! In-memory video store.
//!
//! Used for local development and tests. Records live for the lifetime of
//! the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use cverse_models::{VideoId, VideoRecord, VideoUpdate};

use crate::error::{StoreError, StoreResult};
use crate::VideoStore;

/// Thread-safe in-memory store keyed by video id.
#[derive(Clone, Default)]
pub struct InMemoryVideoStore {
    records: Arc<RwLock<HashMap<VideoId, VideoRecord>>>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: VideoRecord) {
        let mut records = self.records.write().await;
        records.insert(record.video_id.clone(), record);
    }

    pub async fn get(&self, video_id: &VideoId) -> Option<VideoRecord> {
        self.records.read().await.get(video_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every record, ordered by video id.
    pub async fn snapshot(&self) -> Vec<VideoRecord> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.video_id.as_str().cmp(b.video_id.as_str()));
        all
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn find_by_upload_id(&self, upload_id: &str) -> StoreResult<Option<VideoRecord>> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.upload_id == upload_id).cloned())
    }

    async fn update(&self, video_id: &VideoId, update: &VideoUpdate) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(video_id)
            .ok_or_else(|| StoreError::not_found(video_id.as_str()))?;
        record.apply(update);
        debug!(video_id = %video_id, status = %record.status, "Updated in-memory video record");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cverse_models::VideoStatus;

    #[tokio::test]
    async fn test_find_by_upload_id() {
        let store = InMemoryVideoStore::new();
        store.insert(VideoRecord::pending("vid-1", "up-1")).await;
        store.insert(VideoRecord::pending("vid-2", "up-2")).await;

        let found = store.find_by_upload_id("up-2").await.unwrap().unwrap();
        assert_eq!(found.video_id.as_str(), "vid-2");
        assert!(store.find_by_upload_id("up-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryVideoStore::new();
        store.insert(VideoRecord::pending("vid-1", "up-1")).await;

        let id = VideoId::from("vid-1");
        store
            .update(&id, &VideoUpdate::default().with_asset_id("asset-1").with_status(VideoStatus::Processing))
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.asset_id.as_deref(), Some("asset-1"));
        assert_eq!(record.status, VideoStatus::Processing);
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = InMemoryVideoStore::new();
        let err = store
            .update(&VideoId::from("nope"), &VideoUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.is_empty().await);
    }
}
