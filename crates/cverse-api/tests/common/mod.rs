//! Shared fixtures for router tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Response;
use axum::Router;

use cverse_api::{create_router, ApiConfig, AppState};
use cverse_models::UploadGrant;
use cverse_mux::signature::unix_now;
use cverse_mux::{CreateUploadRequest, MuxError, MuxResult, UploadProvider, WebhookVerifier};
use cverse_store::InMemoryVideoStore;

pub const FRONTEND: &str = "https://app.creator-verse.test";
pub const WEBHOOK_SECRET: &str = "whsec-router-tests";

/// What the fake provider should answer.
#[derive(Clone)]
pub enum FakeReply {
    Grant(UploadGrant),
    Malformed,
    ApiError(Vec<String>),
}

/// `UploadProvider` that records every request it receives.
pub struct FakeProvider {
    reply: FakeReply,
    calls: AtomicUsize,
    requests: Mutex<Vec<CreateUploadRequest>>,
}

impl FakeProvider {
    pub fn new(reply: FakeReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn granting(url: &str, id: &str) -> Arc<Self> {
        Self::new(FakeReply::Grant(UploadGrant {
            url: url.to_string(),
            id: id.to_string(),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CreateUploadRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl UploadProvider for FakeProvider {
    async fn create_upload(&self, request: &CreateUploadRequest) -> MuxResult<UploadGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            FakeReply::Grant(grant) => Ok(grant.clone()),
            FakeReply::Malformed => Err(MuxError::malformed(
                "response missing data.url",
                serde_json::json!({"data": {"id": "up_partial"}}),
            )),
            FakeReply::ApiError(messages) => Err(MuxError::Api {
                status: 401,
                messages: messages.clone(),
            }),
        }
    }
}

pub fn config() -> ApiConfig {
    ApiConfig::default().with_allowed_origins([FRONTEND])
}

/// Router with a provider, a webhook secret and the given store.
pub fn app(provider: Arc<FakeProvider>, store: &InMemoryVideoStore) -> Router {
    let state = AppState::new(config(), Arc::new(store.clone()))
        .with_upload_provider(provider)
        .with_webhook_secret(WEBHOOK_SECRET);
    create_router(state, None)
}

pub fn sign(body: &[u8]) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET)
        .sign(body, unix_now())
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
