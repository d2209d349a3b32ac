//! Access token caching for Firestore requests.
//!
//! Tokens are refreshed `TOKEN_REFRESH_MARGIN` before expiry. Refresh is
//! single-flight: the first task to find a stale token takes the write lock,
//! everyone else re-checks once it is released.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Used when the provider reports an expiry we can't interpret.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for the Firestore REST API.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct FetchedToken {
    pub access_token: String,
    pub ttl: Duration,
}

/// Where access tokens come from.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn fetch(&self) -> FirestoreResult<FetchedToken>;
}

/// Google credentials resolved by `gcp_auth` (service account file,
/// gcloud user credentials or the metadata server).
pub struct GcpTokenSource {
    provider: Arc<dyn TokenProvider>,
}

impl GcpTokenSource {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    /// Discover credentials from the environment.
    pub async fn discover() -> FirestoreResult<Self> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| FirestoreError::auth_error(format!("No Google credentials available: {}", e)))?;
        Ok(Self::new(provider))
    }
}

#[async_trait]
impl AccessTokenSource for GcpTokenSource {
    async fn fetch(&self) -> FirestoreResult<FetchedToken> {
        let token = self
            .provider
            .token(&[FIRESTORE_SCOPE])
            .await
            .map_err(|e| FirestoreError::auth_error(e.to_string()))?;

        let now = Utc::now();
        let expires_at = token.expires_at();
        let ttl = if expires_at > now {
            (expires_at - now).to_std().unwrap_or(TOKEN_DEFAULT_TTL)
        } else {
            Duration::ZERO
        };

        Ok(FetchedToken {
            access_token: token.as_str().to_string(),
            ttl,
        })
    }
}

/// Fixed token. The emulator accepts `owner` as a full-access bearer.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn emulator() -> Self {
        Self::new("owner")
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn fetch(&self) -> FirestoreResult<FetchedToken> {
        Ok(FetchedToken {
            access_token: self.token.clone(),
            ttl: TOKEN_DEFAULT_TTL,
        })
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache.
pub struct TokenCache {
    source: Arc<dyn AccessTokenSource>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    pub async fn get_token(&self) -> FirestoreResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.access_token.clone());
        }

        match self.source.fetch().await {
            Ok(fetched) => {
                debug!(ttl_secs = fetched.ttl.as_secs(), "Refreshed Firestore access token");
                *cache = Some(CachedToken {
                    access_token: fetched.access_token.clone(),
                    expires_at: Instant::now() + fetched.ttl,
                });
                Ok(fetched.access_token)
            }
            Err(e) => match cache.as_ref().filter(|c| c.is_usable()) {
                Some(cached) => {
                    warn!(error = %e, "Token refresh failed, reusing current token");
                    Ok(cached.access_token.clone())
                }
                None => Err(e),
            },
        }
    }
}
