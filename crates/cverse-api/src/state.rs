//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use cverse_firestore::FirestoreVideoStore;
use cverse_mux::{MuxClient, MuxError, UploadProvider, WebhookVerifier};
use cverse_store::{InMemoryVideoStore, VideoStore};

use crate::config::{ApiConfig, StoreBackend};
use crate::cors::CorsPolicy;
use crate::services::Reconciler;

/// Shared application state.
///
/// The provider client and webhook verifier are optional: a deployment
/// missing their credentials still serves, and the affected route answers
/// with a configuration error.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cors: CorsPolicy,
    pub uploads: Option<Arc<dyn UploadProvider>>,
    pub verifier: Option<Arc<WebhookVerifier>>,
    pub store: Arc<dyn VideoStore>,
    pub reconciler: Reconciler,
}

impl AppState {
    /// State with no provider and no webhook secret.
    pub fn new(config: ApiConfig, store: Arc<dyn VideoStore>) -> Self {
        Self {
            cors: CorsPolicy::new(&config.allowed_origins),
            config,
            uploads: None,
            verifier: None,
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn with_upload_provider(mut self, provider: Arc<dyn UploadProvider>) -> Self {
        self.uploads = Some(provider);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        let verifier = WebhookVerifier::new(secret).with_tolerance(self.config.webhook_tolerance);
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Wire up provider, verifier and store from the environment.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn VideoStore> = match config.store_backend {
            StoreBackend::Memory => {
                warn!("Using in-memory video store; records are lost on restart");
                Arc::new(InMemoryVideoStore::new())
            }
            StoreBackend::Firestore => {
                let store = FirestoreVideoStore::from_env()
                    .await
                    .context("failed to initialise Firestore video store")?;
                info!(collection = %store.collection(), "Using Firestore video store");
                Arc::new(store)
            }
        };

        let mut state = Self::new(config, store);

        if state.cors.is_empty() {
            warn!("No allowed origins configured (FRONTEND_URL / CORS_ORIGINS); upload requests will be refused");
        }

        match MuxClient::from_env() {
            Ok(client) => state = state.with_upload_provider(Arc::new(client)),
            Err(MuxError::Config(reason)) => {
                warn!(reason = %reason, "Mux credentials missing; POST /uploads will fail");
            }
            Err(e) => return Err(e).context("failed to build Mux client"),
        }

        match std::env::var("MUX_WEBHOOK_SECRET") {
            Ok(secret) if !secret.is_empty() => state = state.with_webhook_secret(secret),
            _ => warn!("MUX_WEBHOOK_SECRET not set; webhook deliveries will be rejected"),
        }

        Ok(state)
    }
}
