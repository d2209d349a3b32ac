//! Mux REST API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info_span, warn, Instrument};

use cverse_models::UploadGrant;

use crate::config::MuxConfig;
use crate::error::{MuxError, MuxResult};
use crate::provider::{CreateUploadRequest, UploadProvider};

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "mux_requests_total";
    pub const LATENCY_SECONDS: &str = "mux_latency_seconds";
}

/// Error body returned by the Mux API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    messages: Vec<String>,
}

/// Mux Video API client.
#[derive(Clone)]
pub struct MuxClient {
    http: Client,
    config: MuxConfig,
}

impl MuxClient {
    /// Create a new client.
    pub fn new(config: MuxConfig) -> MuxResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("cverse-mux/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MuxResult<Self> {
        Self::new(MuxConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Create a direct upload and return its URL and id.
    pub async fn create_direct_upload(&self, request: &CreateUploadRequest) -> MuxResult<UploadGrant> {
        let url = self.url("/video/v1/uploads");
        let span = info_span!("mux_request", operation = "create_upload", cors_origin = %request.cors_origin);

        let start = Instant::now();
        let result = async {
            let response = self
                .http
                .post(&url)
                .basic_auth(&self.config.token_id, Some(&self.config.token_secret))
                .json(request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if !status.is_success() {
                return Err(Self::api_error(status, &body));
            }

            parse_upload_response(&body)
        }
        .instrument(span)
        .await;

        let status = match &result {
            Ok(_) => 201,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request("create_upload", status, start.elapsed());

        if let Ok(grant) = &result {
            debug!(upload_id = %grant.id, "Created Mux direct upload");
        }
        result
    }

    fn api_error(status: StatusCode, body: &str) -> MuxError {
        let messages = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => {
                let mut messages = parsed.error.messages;
                if messages.is_empty() {
                    messages.extend(parsed.error.error_type);
                }
                messages
            }
            Err(_) => vec![truncate(body, 200)],
        };
        warn!(status = status.as_u16(), messages = ?messages, "Mux API request failed");
        MuxError::Api {
            status: status.as_u16(),
            messages,
        }
    }
}

#[async_trait]
impl UploadProvider for MuxClient {
    async fn create_upload(&self, request: &CreateUploadRequest) -> MuxResult<UploadGrant> {
        self.create_direct_upload(request).await
    }
}

/// Extract `data.url` and `data.id` from a create-upload response body.
fn parse_upload_response(body: &str) -> MuxResult<UploadGrant> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| MuxError::malformed(format!("invalid JSON: {}", e), serde_json::Value::String(truncate(body, 200))))?;

    let data = value.get("data");
    let field = |name: &str| {
        data.and_then(|d| d.get(name))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match (field("url"), field("id")) {
        (Some(url), Some(id)) => Ok(UploadGrant { url, id }),
        (None, _) => Err(MuxError::malformed("response is missing data.url", value)),
        (_, None) => Err(MuxError::malformed("response is missing data.id", value)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn record_request(operation: &str, status: u16, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(names::LATENCY_SECONDS, "operation" => operation.to_string()).record(elapsed.as_secs_f64());
}
