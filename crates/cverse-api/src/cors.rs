//! Origin allow-list for the upload endpoint.
//!
//! The upload route answers CORS itself instead of using `tower_http::cors`:
//! a disallowed origin must get a `403` body rather than a silently
//! stripped response, and the verified origin is forwarded to the provider.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue};
use url::Url;

pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Origin accepted by the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigin {
    /// Matched an explicit allow-list entry; carries the caller's origin.
    Exact(String),
    /// Allowed through a `*` entry.
    Any(Option<String>),
}

impl AllowedOrigin {
    /// Value to hand the provider as the upload's `cors_origin`.
    pub fn cors_origin(&self) -> &str {
        match self {
            AllowedOrigin::Exact(origin) | AllowedOrigin::Any(Some(origin)) => origin,
            AllowedOrigin::Any(None) => "*",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    origins: Vec<String>,
    allow_any: bool,
}

/// `scheme://host[:port]`, lowercased, without path or trailing slash.
fn normalize(origin: &str) -> Option<String> {
    let url = Url::parse(origin.trim()).ok()?;
    let serialized = url.origin().ascii_serialization();
    (serialized != "null").then_some(serialized)
}

impl CorsPolicy {
    pub fn new(origins: &[String]) -> Self {
        let allow_any = origins.iter().any(|o| o.trim() == "*");
        let origins = origins.iter().filter_map(|o| normalize(o)).collect();
        Self { origins, allow_any }
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty() && !self.allow_any
    }

    /// Check the request's `Origin` header against the allow-list.
    pub fn check(&self, origin: Option<&str>) -> Option<AllowedOrigin> {
        let normalized = origin.and_then(normalize);

        if let Some(origin) = &normalized {
            if self.origins.iter().any(|o| o == origin) {
                return Some(AllowedOrigin::Exact(origin.clone()));
            }
        }

        self.allow_any.then(|| AllowedOrigin::Any(normalized))
    }

    /// Response headers for a request whose origin check produced `allowed`.
    ///
    /// Methods, headers and `Vary` are always present; the origin and
    /// credentials headers only when the origin was accepted.
    pub fn headers(&self, allowed: Option<&AllowedOrigin>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
        headers.insert(VARY, HeaderValue::from_static("Origin"));

        match allowed {
            Some(AllowedOrigin::Exact(origin)) => {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
                }
            }
            // Credentials are not allowed together with a wildcard origin.
            Some(AllowedOrigin::Any(_)) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            None => {}
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origins: &[&str]) -> CorsPolicy {
        CorsPolicy::new(&origins.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_exact_match_ignores_trailing_slash_and_case() {
        let policy = policy(&["https://App.Example.com/"]);
        assert_eq!(
            policy.check(Some("https://app.example.com")),
            Some(AllowedOrigin::Exact("https://app.example.com".into()))
        );
    }

    #[test]
    fn test_rejects_other_origins_and_missing_origin() {
        let policy = policy(&["https://app.example.com"]);
        assert_eq!(policy.check(Some("https://evil.example.com")), None);
        assert_eq!(policy.check(Some("http://app.example.com")), None);
        assert_eq!(policy.check(Some("not a url")), None);
        assert_eq!(policy.check(None), None);
    }

    #[test]
    fn test_empty_policy_rejects_everything() {
        let policy = policy(&[]);
        assert!(policy.is_empty());
        assert_eq!(policy.check(Some("https://app.example.com")), None);
    }

    #[test]
    fn test_wildcard() {
        let policy = policy(&["*"]);
        let allowed = policy.check(Some("https://any.example.com")).unwrap();
        assert_eq!(allowed.cors_origin(), "https://any.example.com");
        assert_eq!(policy.check(None).unwrap().cors_origin(), "*");

        let headers = policy.headers(Some(&allowed));
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_headers_for_exact_origin() {
        let policy = policy(&["https://app.example.com"]);
        let allowed = policy.check(Some("https://app.example.com"));
        let headers = policy.headers(allowed.as_ref());

        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://app.example.com");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST, OPTIONS");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "Content-Type, Authorization");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        assert_eq!(headers.get(VARY).unwrap(), "Origin");
    }

    #[test]
    fn test_headers_for_rejected_origin_omit_allow_origin() {
        let policy = policy(&["https://app.example.com"]);
        let headers = policy.headers(None);
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST, OPTIONS");
    }
}
