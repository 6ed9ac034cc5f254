use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::signature::{SignatureError, SignatureVerifier};
use super::{GatewayError, PaymentGateway, PaymentIntent, USER_ID_METADATA_KEY};
use crate::config::mask_secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe credentials and client tuning, built once from configuration.
#[derive(Clone)]
pub struct StripeSettings {
    pub api_base: String,
    pub secret_key: String,
    pub publishable_key: String,
    pub webhook_secret: String,
    pub timeout: Duration,
    pub webhook_tolerance: Duration,
}

impl fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeSettings")
            .field("api_base", &self.api_base)
            .field("secret_key", &mask_secret(&self.secret_key))
            .field("publishable_key", &mask_secret(&self.publishable_key))
            .field("webhook_secret", &mask_secret(&self.webhook_secret))
            .field("timeout", &self.timeout)
            .field("webhook_tolerance", &self.webhook_tolerance)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// HTTP client for the Stripe REST API
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    settings: StripeSettings,
    currency: String,
    verifier: SignatureVerifier,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl StripeClient {
    /// Creates a client charging in `currency` (ISO code, any case).
    pub fn new(settings: StripeSettings, currency: String) -> Result<Self, GatewayError> {
        Self::with_circuit_breaker(settings, currency, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        settings: StripeSettings,
        currency: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        let verifier =
            SignatureVerifier::new(settings.webhook_secret.clone(), settings.webhook_tolerance);

        Ok(StripeClient {
            client,
            settings,
            currency,
            verifier,
            circuit_breaker,
        })
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn payment_intents_url(&self) -> String {
        format!(
            "{}/v1/payment_intents",
            self.settings.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_intent(
        &self,
        user_id: &str,
        amount_minor: i64,
    ) -> Result<PaymentIntent, GatewayError> {
        if user_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "user_id must not be empty".to_string(),
            ));
        }
        if amount_minor <= 0 {
            return Err(GatewayError::InvalidRequest(
                "amount must be greater than zero".to_string(),
            ));
        }

        let url = self.payment_intents_url();
        let client = self.client.clone();
        let secret_key = self.settings.secret_key.clone();
        let form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), self.currency.to_lowercase()),
            (format!("metadata[{}]", USER_ID_METADATA_KEY), user_id.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        // Declined or invalid requests are the caller's problem and must not trip the breaker.
        let result = self
            .circuit_breaker
            .call_with(
                |err: &GatewayError| err.is_outage(),
                async move {
                    let response = client
                        .post(&url)
                        .bearer_auth(&secret_key)
                        .form(&form)
                        .send()
                        .await?;

                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(GatewayError::Api {
                            status: status.as_u16(),
                            message: api_error_message(&body),
                        });
                    }

                    let intent = response.json::<PaymentIntentResponse>().await?;
                    let client_secret = intent.client_secret.ok_or_else(|| {
                        GatewayError::InvalidResponse(format!(
                            "payment intent {} has no client_secret",
                            intent.id
                        ))
                    })?;

                    Ok::<_, GatewayError>(PaymentIntent {
                        client_secret,
                        payment_id: intent.id,
                    })
                },
            )
            .await;

        match result {
            Ok(intent) => {
                tracing::debug!(payment_id = %intent.payment_id, "Stripe payment intent created");
                Ok(intent)
            }
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen(
                "Stripe API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), SignatureError> {
        self.verifier.verify(payload, signature_header)
    }
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match (parsed.error.kind, parsed.error.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (None, Some(message)) => message,
            (Some(kind), None) => kind,
            (None, None) => "unknown error".to_string(),
        },
        Err(_) if body.is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}
