//! Payment processor boundary.
//!
//! `PaymentGateway` is the seam the reconciliation logic calls through:
//! creating a payment intent and authenticating webhook deliveries.
//! `StripeClient` is the production implementation.

pub mod event;
pub mod signature;
pub mod stripe;

pub use event::{PaymentIntentObject, StripeEvent};
pub use signature::{SignatureError, SignatureVerifier};
pub use stripe::{StripeClient, StripeSettings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header Stripe uses to carry the webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Metadata key used to correlate a payment intent with its owner.
pub const USER_ID_METADATA_KEY: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_id: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    /// The processor did not answer in time. The intent may or may not exist remotely.
    #[error("Payment processor timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Payment processor rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from payment processor: {0}")]
    InvalidResponse(String),

    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),
}

impl GatewayError {
    /// Failures that say something about processor health, as opposed to a bad request.
    pub fn is_outage(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Transport(_) => true,
            GatewayError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote payment intent tagged with `user_id` in its metadata.
    async fn create_intent(
        &self,
        user_id: &str,
        amount_minor: i64,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Authenticates a raw webhook body against its signature header.
    fn verify_signature(&self, payload: &[u8], signature_header: &str)
        -> Result<(), SignatureError>;
}
