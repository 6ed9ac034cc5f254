//! Stripe webhook event envelope.
//!
//! Only `payment_intent.succeeded` is given a typed payload; every other event
//! type is kept as its name so the caller can acknowledge and ignore it.

use serde::Deserialize;
use std::collections::HashMap;

use super::USER_ID_METADATA_KEY;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

/// The subset of a Stripe PaymentIntent object this service reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentObject {
    /// The owner tag set at creation time. Blank values count as missing.
    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEvent {
    PaymentIntentSucceeded {
        event_id: Option<String>,
        intent: PaymentIntentObject,
    },
    Other {
        event_id: Option<String>,
        event_type: String,
    },
}

impl StripeEvent {
    /// Parses an already-authenticated webhook body.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_slice(raw)?;

        if envelope.event_type == PAYMENT_INTENT_SUCCEEDED {
            let intent = serde_json::from_value(envelope.data.object)?;
            return Ok(StripeEvent::PaymentIntentSucceeded {
                event_id: envelope.id,
                intent,
            });
        }

        Ok(StripeEvent::Other {
            event_id: envelope.id,
            event_type: envelope.event_type,
        })
    }

    pub fn event_type(&self) -> &str {
        match self {
            StripeEvent::PaymentIntentSucceeded { .. } => PAYMENT_INTENT_SUCCEEDED,
            StripeEvent::Other { event_type, .. } => event_type,
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            StripeEvent::PaymentIntentSucceeded { event_id, .. }
            | StripeEvent::Other { event_id, .. } => event_id.as_deref(),
        }
    }
}
