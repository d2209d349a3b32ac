//! Webhook signature verification.
//!
//! Mux signs each delivery with a `mux-signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>` where the HMAC-SHA256 is computed over
//! `"{t}.{raw body}"` with the webhook signing secret. Verification always
//! runs over the exact bytes received; the body is never re-serialized.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "mux-signature";

/// Maximum accepted age of a signature timestamp.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

const SCHEME: &str = "v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature header has no timestamp")]
    MissingTimestamp,

    #[error("Signature header has no v1 signature")]
    MissingSignature,

    #[error("Signature timestamp outside tolerance ({age_secs}s)")]
    TimestampOutsideTolerance { age_secs: i64 },

    #[error("Signature does not match payload")]
    Mismatch,

    #[error("Invalid signing secret")]
    InvalidSecret,
}

/// Parsed `mux-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    timestamp_raw: &'a str,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut timestamp_raw = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or(SignatureError::MalformedHeader)?;
            match key {
                "t" => timestamp_raw = Some(value),
                SCHEME => signatures.push(value),
                // Other schemes are ignored so the provider can roll new ones out.
                _ => {}
            }
        }

        let timestamp_raw = timestamp_raw.ok_or(SignatureError::MissingTimestamp)?;
        let timestamp = timestamp_raw.parse().map_err(|_| SignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(SignatureError::MissingSignature);
        }

        Ok(Self {
            timestamp,
            timestamp_raw,
            signatures,
        })
    }
}

/// Verifies webhook deliveries against a shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify `raw_body` against a `mux-signature` header value using the current time.
    pub fn verify(&self, raw_body: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(raw_body, header, unix_now())
    }

    /// Verify against an explicit clock reading (unix seconds).
    pub fn verify_at(&self, raw_body: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let parsed = SignatureHeader::parse(header)?;

        // Timestamps far enough from `now` to overflow are out of tolerance too.
        let age_secs = now.checked_sub(parsed.timestamp).unwrap_or(i64::MAX);
        if age_secs.unsigned_abs() > self.tolerance.as_secs() {
            return Err(SignatureError::TimestampOutsideTolerance { age_secs });
        }

        let mac = self.mac_for(parsed.timestamp_raw, raw_body)?;
        let matched = parsed.signatures.iter().any(|candidate| match hex::decode(candidate) {
            // verify_slice compares in constant time
            Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
            Err(_) => false,
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Produce a header value for `raw_body` at `timestamp`.
    pub fn sign(&self, raw_body: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let timestamp_raw = timestamp.to_string();
        let mac = self.mac_for(&timestamp_raw, raw_body)?;
        Ok(format!(
            "t={},{}={}",
            timestamp_raw,
            SCHEME,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac_for(&self, timestamp_raw: &str, raw_body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp_raw.as_bytes());
        mac.update(b".");
        mac.update(raw_body);
        Ok(mac)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
