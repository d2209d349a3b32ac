//! Firestore REST API client.
//!
//! Covers the handful of calls the video store needs:
//! - structured queries (`documents:runQuery`)
//! - masked patches guarded by `currentDocument.exists`
//! - single document reads
//!
//! Every call goes through the token cache, retries once on an expired
//! token, and records latency metrics under a `firestore_request` span.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::{AccessTokenSource, GcpTokenSource, StaticTokenSource, TokenCache};
use crate::types::{Document, RunQueryRequest, RunQueryResponse, StructuredQuery, Value};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Usually "(default)"
    pub database_id: String,
    /// API root, e.g. `https://firestore.googleapis.com/v1`
    pub base_url: String,
    /// Set when talking to the local emulator; skips Google credentials.
    pub emulator: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            emulator: false,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Point at a non-Google endpoint (emulator or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.emulator = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .unwrap_or_default();

        if project_id.is_empty() {
            return Err(FirestoreError::config(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to use the Firestore store",
            ));
        }

        let mut config = Self::new(project_id);

        if let Ok(db) = std::env::var("FIRESTORE_DATABASE_ID") {
            if !db.is_empty() {
                config.database_id = db;
            }
        }

        if let Some(secs) = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.connect_timeout = Duration::from_secs(secs);
        }

        if let Ok(host) = std::env::var("FIRESTORE_EMULATOR_HOST") {
            if !host.is_empty() {
                config = config.with_base_url(format!("http://{}/v1", host));
            }
        }

        config.retry = RetryConfig::from_env();
        Ok(config)
    }

    /// `projects/{p}/databases/{d}/documents` under the API root.
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    documents_root: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    /// Create a client, resolving Google credentials unless the config
    /// targets the emulator.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let source: Arc<dyn AccessTokenSource> = if config.emulator {
            info!(base_url = %config.base_url, "Using Firestore emulator credentials");
            Arc::new(StaticTokenSource::emulator())
        } else {
            Arc::new(GcpTokenSource::discover().await?)
        };
        Self::with_token_source(config, source)
    }

    pub fn with_token_source(config: FirestoreConfig, source: Arc<dyn AccessTokenSource>) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("cverse-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        Ok(Self {
            http,
            documents_root: config.documents_root(),
            config,
            token_cache: Arc::new(TokenCache::new(source)),
        })
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_root,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send with a bearer token; on an expired-token 401, refresh and resend once.
    async fn send_authorized<B>(&self, build: B) -> FirestoreResult<Response>
    where
        B: Fn(&str) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::auth_error(body));
        }

        debug!("Firestore token rejected as expired, refreshing");
        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Read one document. `Ok(None)` when it does not exist.
    pub async fn get_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>> {
        let url = &self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), move || async move {
            let response = self.send_authorized(|token| self.http.get(url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Patch only the fields in `fields`. Fails with `NotFound` instead of
    /// creating the document when it does not exist.
    pub async fn patch_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let mut mask: Vec<String> = fields.keys().cloned().collect();
        mask.sort();

        let mut query: Vec<(&str, &str)> = mask
            .iter()
            .map(|f| ("updateMask.fieldPaths", f.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let query = &query;
        let url = &self.document_url(collection, doc_id);
        let body = &Document::new(fields);

        self.execute_request("patch_document", collection, Some(doc_id), move || async move {
            let response = self
                .send_authorized(|token| self.http.patch(url).query(query).bearer_auth(token).json(body))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id))),
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Run a structured query against the database root.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let url = &format!("{}:runQuery", self.documents_root);
        let request = &RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, move || async move {
            let response = self
                .send_authorized(|token| self.http.post(url).bearer_auth(token).json(request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    // runQuery streams an array; entries without a document are progress markers.
                    let items: Vec<RunQueryResponse> = response.json().await?;
                    Ok(items.into_iter().filter_map(|r| r.document).collect())
                }
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Cheap connectivity check. A missing probe document still proves the
    /// database answered.
    pub async fn ping(&self) -> FirestoreResult<()> {
        self.get_document("_health", "_check").await.map(|_| ())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run one operation with retries, a tracing span and metrics.
    async fn execute_request<T, F, Fut>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        op: F,
    ) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = match doc_id {
            Some(id) => info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id),
            None => info_span!("firestore_request", operation = %operation, collection = %collection),
        };

        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op).instrument(span).await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_secs_f64());

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
