//! Stripe webhook signature scheme.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v0=<hex>`.
//! The signed message is `"{t}.{raw body}"`, MACed with HMAC-SHA256 under the
//! endpoint's webhook secret. Every `v1` entry is a candidate; one match is
//! enough. Timestamps outside the tolerance window are rejected to stop replays.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

const SCHEME_V1: &str = "v1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is empty")]
    MissingHeader,

    #[error("malformed signature header: {0}")]
    Malformed(String),

    #[error("signature header has no v1 signature")]
    NoSignatures,

    #[error("timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    Stale { timestamp: i64, tolerance_secs: u64 },

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("webhook secret is not configured")]
    NotConfigured,
}

/// Parsed form of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let header = header.trim();
        if header.is_empty() {
            return Err(SignatureError::MissingHeader);
        }

        let mut timestamp = None;
        let mut signatures = Vec::new();

        for item in header.split(',') {
            let (key, value) = item
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::Malformed(format!("'{}' is not key=value", item)))?;
            match key {
                "t" => {
                    let ts = value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::Malformed(format!("bad timestamp '{}'", value)))?;
                    timestamp = Some(ts);
                }
                SCHEME_V1 => {
                    let bytes = hex::decode(value)
                        .map_err(|_| SignatureError::Malformed("v1 signature is not hex".into()))?;
                    signatures.push(bytes);
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SignatureError::Malformed("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Verifies webhook deliveries for one endpoint secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        if self.secret.is_empty() {
            return Err(SignatureError::NotConfigured);
        }

        let parsed = SignatureHeader::parse(header)?;

        if now.abs_diff(parsed.timestamp) > self.tolerance.as_secs() {
            return Err(SignatureError::Stale {
                timestamp: parsed.timestamp,
                tolerance_secs: self.tolerance.as_secs(),
            });
        }

        let base = self.mac_for(parsed.timestamp, payload)?;
        for candidate in &parsed.signatures {
            // verify_slice compares in constant time
            if base.clone().verify_slice(candidate).is_ok() {
                return Ok(());
            }
        }

        Err(SignatureError::Mismatch)
    }

    fn mac_for(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::NotConfigured)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// Builds a `Stripe-Signature` header value for `payload` at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let verifier = SignatureVerifier::new(secret, DEFAULT_TOLERANCE);
    let digest = match verifier.mac_for(timestamp, payload) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    };
    format!("t={},{}={}", timestamp, SCHEME_V1, digest)
}
