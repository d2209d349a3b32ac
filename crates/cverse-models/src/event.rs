//! Provider webhook envelope.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::AssetData;

/// Decoded webhook envelope.
///
/// Only `type` and `data` are required; the remaining envelope fields are
/// informational and kept for logging.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl WebhookEvent {
    /// Routing kind derived from the raw `type` string.
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event_type)
    }

    /// Decode `data` as an asset payload.
    pub fn asset_data(&self) -> Result<AssetData, serde_json::Error> {
        AssetData::deserialize(&self.data)
    }
}

/// Event types the dispatcher knows how to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    AssetCreated,
    AssetReady,
    AssetErrored,
    /// Anything else; acknowledged and logged only.
    Unhandled(String),
}

impl EventKind {
    /// Map a provider event type to a kind.
    ///
    /// Accepts both the fully-qualified `video.asset.ready` form and the
    /// short `asset.ready` form.
    pub fn parse(event_type: &str) -> Self {
        let short = event_type.strip_prefix("video.").unwrap_or(event_type);
        match short {
            "asset.created" => EventKind::AssetCreated,
            "asset.ready" => EventKind::AssetReady,
            "asset.errored" => EventKind::AssetErrored,
            _ => EventKind::Unhandled(event_type.to_string()),
        }
    }

    /// Low-cardinality label for metrics and logs.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::AssetCreated => "asset.created",
            EventKind::AssetReady => "asset.ready",
            EventKind::AssetErrored => "asset.errored",
            EventKind::Unhandled(_) => "unhandled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Unhandled(raw) => write!(f, "unhandled({})", raw),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
