//! Router tests for `/webhooks/video`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use cverse_api::{create_router, AppState};
use cverse_models::{VideoId, VideoRecord, VideoStatus};
use cverse_mux::SIGNATURE_HEADER;
use cverse_store::InMemoryVideoStore;

use common::{app, config, json_body, sign, FakeProvider};

const READY_EVENT: &str = r#"{
  "type": "video.asset.ready",
  "id": "evt_1",
  "data": {
    "id": "asset_1",
    "upload_id": "up_1",
    "duration": 42.0,
    "status": "ready",
    "playback_ids": [{"id": "pb_1", "policy": "public"}]
  }
}"#;

async fn seeded() -> (InMemoryVideoStore, Router) {
    let store = InMemoryVideoStore::new();
    store.insert(VideoRecord::pending("vid-1", "up_1")).await;
    let router = app(FakeProvider::granting("https://u", "up"), &store);
    (store, router)
}

fn signed(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/video")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, sign(body.as_bytes()))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_signature(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/video")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Signed request whose body is twice the configured limit.
fn oversized() -> Request<Body> {
    let body = vec![b' '; config().max_body_size * 2];
    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/video")
        .header("content-length", body.len())
        .header(SIGNATURE_HEADER, sign(&body))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_ready_event_marks_record_ready() {
    let (store, app) = seeded().await;

    let response = app.oneshot(signed(READY_EVENT)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"received": true, "message": "Webhook processed."})
    );

    let record = store.get(&VideoId::from("vid-1")).await.unwrap();
    assert_eq!(record.status, VideoStatus::Ready);
    assert_eq!(record.playback_id.as_deref(), Some("pb_1"));
    assert_eq!(record.video_url.as_deref(), Some("https://stream.mux.com/pb_1.m3u8"));
    assert_eq!(record.duration, Some(42.0));
}

#[tokio::test]
async fn test_invalid_signatures_are_rejected_without_mutation() {
    let (store, app) = seeded().await;
    let before = store.snapshot().await;

    let valid = sign(READY_EVENT.as_bytes());
    let wrong_secret = cverse_mux::WebhookVerifier::new("some-other-secret")
        .sign(READY_EVENT.as_bytes(), cverse_mux::signature::unix_now())
        .unwrap();
    let stale = cverse_mux::WebhookVerifier::new(common::WEBHOOK_SECRET)
        .sign(READY_EVENT.as_bytes(), cverse_mux::signature::unix_now() - 3600)
        .unwrap();

    let cases = vec![
        // signed body re-serialized with different whitespace
        with_signature(&serde_json::to_string(&serde_json::from_str::<serde_json::Value>(READY_EVENT).unwrap()).unwrap(), &valid),
        with_signature(READY_EVENT, &wrong_secret),
        with_signature(READY_EVENT, &stale),
        with_signature(READY_EVENT, "garbage"),
        with_signature(READY_EVENT, "t=123"),
    ];

    for request in cases {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_missing_signature_header_is_400() {
    let (store, app) = seeded().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/video")
        .body(Body::from(READY_EVENT))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Signature missing.");
    assert_eq!(
        store.get(&VideoId::from("vid-1")).await.unwrap().status,
        VideoStatus::Pending
    );
}

#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let (store, app) = seeded().await;

    let first = app.clone().oneshot(signed(READY_EVENT)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let after_once = store.snapshot().await;

    let second = app.oneshot(signed(READY_EVENT)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(store.snapshot().await, after_once);
}

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged() {
    let (store, app) = seeded().await;
    let before = store.snapshot().await;

    let body = r#"{"type":"unknown.event","data":{"id":"x","upload_id":"up_1"}}"#;
    let response = app.oneshot(signed(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["received"], true);
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_unknown_upload_id_is_acknowledged() {
    let (store, app) = seeded().await;
    let before = store.snapshot().await;

    let body = r#"{"type":"video.asset.ready","data":{"id":"asset_9","upload_id":"up_nobody","playback_ids":[]}}"#;
    let response = app.oneshot(signed(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_missing_secret_is_500_for_every_request() {
    let store = InMemoryVideoStore::new();
    let state = AppState::new(config(), Arc::new(store.clone()));
    let app = create_router(state, None);

    for request in [
        signed(READY_EVENT),
        with_signature("not even json", "garbage"),
        Request::builder()
            .method(Method::POST)
            .uri("/webhooks/video")
            .body(Body::empty())
            .unwrap(),
        oversized(),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Webhook secret not configured.");
    }
}

#[tokio::test]
async fn test_non_post_is_405() {
    let (_, app) = seeded().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/webhooks/video")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get("allow").unwrap(), "POST");
}

#[tokio::test]
async fn test_verified_but_malformed_json_is_400() {
    let (_, app) = seeded().await;
    let response = app.oneshot(signed("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_asset_payload_is_processing_error() {
    let (store, app) = seeded().await;
    let body = r#"{"type":"video.asset.ready","data":{"upload_id":"up_1"}}"#;

    let response = app.oneshot(signed(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Error processing webhook event.");
    assert_eq!(
        store.get(&VideoId::from("vid-1")).await.unwrap().status,
        VideoStatus::Pending
    );
}

#[tokio::test]
async fn test_created_then_errored_flow() {
    let (store, app) = seeded().await;

    let created = r#"{"type":"video.asset.created","data":{"id":"asset_1","upload_id":"up_1"}}"#;
    let response = app.clone().oneshot(signed(created)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        store.get(&VideoId::from("vid-1")).await.unwrap().status,
        VideoStatus::Processing
    );

    let errored = r#"{"type":"video.asset.errored","data":{"id":"asset_1","upload_id":"up_1","errors":{"type":"invalid_input","messages":["Unsupported codec"]}}}"#;
    let response = app.oneshot(signed(errored)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = store.get(&VideoId::from("vid-1")).await.unwrap();
    assert_eq!(record.status, VideoStatus::Errored);
    assert_eq!(record.asset_id.as_deref(), Some("asset_1"));
    assert_eq!(record.error_detail.as_deref(), Some("invalid_input: Unsupported codec"));
}

#[tokio::test]
async fn test_oversized_body_is_413_once_secret_is_configured() {
    let (store, app) = seeded().await;

    let response = app.oneshot(oversized()).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"], "Request body too large.");
    assert_eq!(
        store.get(&VideoId::from("vid-1")).await.unwrap().status,
        VideoStatus::Pending
    );
}

#[tokio::test]
async fn test_processing_error_details_hidden_in_production() {
    let store = InMemoryVideoStore::new();
    store.insert(VideoRecord::pending("vid-1", "up_1")).await;
    let mut production = config();
    production.environment = "production".to_string();
    let state = AppState::new(production, Arc::new(store.clone())).with_webhook_secret(common::WEBHOOK_SECRET);
    let app = create_router(state, None);

    let body = r#"{"type":"video.asset.ready","data":{"upload_id":"up_1"}}"#;
    let response = app.oneshot(signed(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Error processing webhook event.");
    assert!(json.get("details").is_none());
}
