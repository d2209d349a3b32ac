//! Mux client configuration.

use std::time::Duration;

use crate::error::{MuxError, MuxResult};

/// Default Mux API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mux.com";

/// Mux API client configuration.
#[derive(Clone)]
pub struct MuxConfig {
    /// Access token id (basic auth user)
    pub token_id: String,
    /// Access token secret (basic auth password)
    pub token_secret: String,
    /// API base URL, overridable for tests
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for MuxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxConfig")
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MuxConfig {
    pub fn new(token_id: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            token_secret: token_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create config from environment variables.
    ///
    /// Fails when `MUX_TOKEN_ID` or `MUX_TOKEN_SECRET` is missing or empty.
    pub fn from_env() -> MuxResult<Self> {
        let token_id = non_empty_var("MUX_TOKEN_ID")
            .ok_or_else(|| MuxError::config("MUX_TOKEN_ID must be set"))?;
        let token_secret = non_empty_var("MUX_TOKEN_SECRET")
            .ok_or_else(|| MuxError::config("MUX_TOKEN_SECRET must be set"))?;

        let timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            token_id,
            token_secret,
            base_url: non_empty_var("MUX_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(5),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_requires_credentials() {
        std::env::remove_var("MUX_TOKEN_ID");
        std::env::remove_var("MUX_TOKEN_SECRET");
        assert!(matches!(MuxConfig::from_env(), Err(MuxError::Config(_))));

        std::env::set_var("MUX_TOKEN_ID", "id");
        std::env::set_var("MUX_TOKEN_SECRET", "   ");
        assert!(MuxConfig::from_env().is_err());
        std::env::remove_var("MUX_TOKEN_ID");
        std::env::remove_var("MUX_TOKEN_SECRET");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::set_var("MUX_TOKEN_ID", "id");
        std::env::set_var("MUX_TOKEN_SECRET", "secret");
        std::env::remove_var("MUX_API_BASE_URL");
        std::env::remove_var("REQUEST_TIMEOUT");

        let config = MuxConfig::from_env().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(format!("{:?}", config).contains("<redacted>"));

        std::env::remove_var("MUX_TOKEN_ID");
        std::env::remove_var("MUX_TOKEN_SECRET");
    }
}
