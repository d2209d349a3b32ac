//! Applies verified asset events to application video records.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use cverse_models::{AssetData, EventKind, VideoId, VideoRecord, VideoStatus, VideoUpdate, WebhookEvent};
use cverse_store::{StoreError, VideoStore};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("undecodable asset payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What happened to an event that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated(VideoId),
    /// Record already reflected the event; nothing written.
    Unchanged(VideoId),
    /// No record correlates with the event's upload id.
    NoRecord,
    MissingUploadId,
    /// Event type this service does not act on.
    Ignored,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Updated(_) => "updated",
            Outcome::Unchanged(_) => "unchanged",
            Outcome::NoRecord => "no_record",
            Outcome::MissingUploadId => "missing_upload_id",
            Outcome::Ignored => "ignored",
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn VideoStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, event: &WebhookEvent) -> Result<Outcome, ReconcileError> {
        let kind = event.kind();
        if let EventKind::Unhandled(raw) = &kind {
            info!(event_type = %raw, event_id = ?event.id, "Unhandled webhook event type");
            return Ok(Outcome::Ignored);
        }

        let asset = event.asset_data()?;
        debug!(
            event_type = %event.event_type,
            event_id = ?event.id,
            asset_id = %asset.id,
            upload_id = ?asset.upload_id,
            "Reconciling asset event"
        );

        let Some(upload_id) = asset.upload_id.as_deref() else {
            warn!(event_type = %kind, asset_id = %asset.id, "Asset event has no upload id");
            return Ok(Outcome::MissingUploadId);
        };

        let Some(record) = self.store.find_by_upload_id(upload_id).await? else {
            warn!(
                event_type = %kind,
                upload_id = %upload_id,
                asset_id = %asset.id,
                backend = self.store.backend(),
                "No video record for upload"
            );
            return Ok(Outcome::NoRecord);
        };

        let update = update_for(&kind, &asset, &record);
        if !changes(&record, &update) {
            debug!(video_id = %record.video_id, event_type = %kind, "Video record already up to date");
            return Ok(Outcome::Unchanged(record.video_id));
        }

        match self.store.update(&record.video_id, &update).await {
            Ok(()) => {
                info!(
                    video_id = %record.video_id,
                    upload_id = %upload_id,
                    event_type = %kind,
                    status = ?update.status,
                    "Video record updated"
                );
                Ok(Outcome::Updated(record.video_id))
            }
            // Deleted between lookup and write.
            Err(StoreError::NotFound(_)) => {
                warn!(video_id = %record.video_id, upload_id = %upload_id, "Video record vanished before update");
                Ok(Outcome::NoRecord)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Fields an event writes onto `record`.
fn update_for(kind: &EventKind, asset: &AssetData, record: &VideoRecord) -> VideoUpdate {
    let update = VideoUpdate::default().with_asset_id(asset.id.as_str());

    match kind {
        EventKind::AssetCreated => {
            // A late or re-delivered `created` must not undo `ready`/`errored`.
            if record.status.is_terminal() {
                update
            } else {
                update.with_status(VideoStatus::Processing)
            }
        }
        EventKind::AssetReady => {
            let update = update
                .with_status(VideoStatus::Ready)
                .with_duration(asset.duration);
            match asset.primary_playback_id() {
                Some(playback_id) => update.with_playback(playback_id),
                None => {
                    warn!(asset_id = %asset.id, "Ready asset has no playback ids");
                    update
                }
            }
        }
        EventKind::AssetErrored => {
            let detail = asset.errors.clone().unwrap_or_default().summary();
            update
                .with_status(VideoStatus::Errored)
                .with_error_detail(detail)
        }
        EventKind::Unhandled(_) => VideoUpdate::default(),
    }
}

/// Whether applying `update` would alter anything but the timestamp.
fn changes(record: &VideoRecord, update: &VideoUpdate) -> bool {
    let mut next = record.clone();
    next.apply(update);
    next.updated_at = record.updated_at;
    next != *record
}
