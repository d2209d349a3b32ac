//! Video record store boundary.
//!
//! The webhook reconciler only needs two operations: find a record by the
//! upload id it was issued for, and merge a set of fields into it. Backends
//! (in-memory, Firestore) implement `VideoStore`.

pub mod error;
pub mod memory;

use async_trait::async_trait;

use cverse_models::{VideoId, VideoRecord, VideoUpdate};

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryVideoStore;

/// Persistent store of application video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Find the record correlated with a provider upload id.
    async fn find_by_upload_id(&self, upload_id: &str) -> StoreResult<Option<VideoRecord>>;

    /// Merge `update` into an existing record. Fields left `None` are untouched.
    async fn update(&self, video_id: &VideoId, update: &VideoUpdate) -> StoreResult<()>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}
