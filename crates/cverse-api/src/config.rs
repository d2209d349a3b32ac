//! API configuration.

use std::time::Duration;

use cverse_mux::DEFAULT_TOLERANCE;

/// Which `VideoStore` backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Firestore,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Some(StoreBackend::Memory),
            "firestore" => Some(StoreBackend::Firestore),
            _ => None,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Origins allowed to request upload grants. `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Per-IP requests per second on `/uploads`
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Accepted age of webhook signature timestamps
    pub webhook_tolerance: Duration,
    pub store_backend: StoreBackend,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: Vec::new(),
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            webhook_tolerance: DEFAULT_TOLERANCE,
            store_backend: StoreBackend::Memory,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            allowed_origins: allowed_origins_from_env(),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            webhook_tolerance: std::env::var("MUX_WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.webhook_tolerance),
            store_backend: std::env::var("VIDEO_STORE")
                .ok()
                .and_then(|s| StoreBackend::parse(&s))
                .unwrap_or_default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// `FRONTEND_URL` plus any comma-separated `CORS_ORIGINS`, deduplicated.
fn allowed_origins_from_env() -> Vec<String> {
    let mut origins: Vec<String> = Vec::new();
    let frontend = std::env::var("FRONTEND_URL").ok();
    let extra = std::env::var("CORS_ORIGINS").ok();

    for origin in frontend
        .iter()
        .chain(extra.iter())
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}
