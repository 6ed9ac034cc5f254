#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use pocket_wallet_core::{
    adapters::{InMemoryAccountStore, InMemoryLedgerStore},
    create_app,
    gateway::{
        signature::{sign, DEFAULT_TOLERANCE},
        GatewayError, PaymentGateway, PaymentIntent, SignatureError, SignatureVerifier,
    },
    use_cases::Reconciler,
    AppState, ClientSettings,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const PUBLISHABLE_KEY: &str = "pk_test_integration";

/// Gateway double: hands out sequential payment ids and verifies signatures
/// with the real verifier.
pub struct FakeGateway {
    verifier: SignatureVerifier,
    created: AtomicUsize,
    verify_calls: AtomicUsize,
    pub fail_with: Option<fn() -> GatewayError>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            verifier: SignatureVerifier::new(WEBHOOK_SECRET, DEFAULT_TOLERANCE),
            created: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    pub fn failing(make_error: fn() -> GatewayError) -> Self {
        Self {
            fail_with: Some(make_error),
            ..Self::new()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of times a webhook signature reached the gateway.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        user_id: &str,
        _amount_minor: i64,
    ) -> Result<PaymentIntent, GatewayError> {
        if let Some(make_error) = self.fail_with {
            return Err(make_error());
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            client_secret: format!("pi_fake_{}_secret_{}", n, user_id),
            payment_id: format!("pi_fake_{}", n),
        })
    }

    fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verifier.verify(payload, header)
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
    pub ledger: InMemoryLedgerStore,
    pub accounts: InMemoryAccountStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(FakeGateway::new())
    }

    pub fn with_gateway(gateway: FakeGateway) -> Self {
        let gateway = Arc::new(gateway);
        let ledger = InMemoryLedgerStore::new();
        let accounts = InMemoryAccountStore::new();

        let reconciler = Reconciler::new(
            gateway.clone(),
            Arc::new(ledger.clone()),
            Arc::new(accounts.clone()),
            "PLN".to_string(),
        );
        let state = AppState {
            reconciler: Arc::new(reconciler),
            accounts: Arc::new(accounts.clone()),
            client: ClientSettings {
                publishable_key: PUBLISHABLE_KEY.to_string(),
                currency: "PLN".to_string(),
            },
        };

        Self {
            router: create_app(state),
            gateway,
            ledger,
            accounts,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::BoxBody> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<axum::body::BoxBody> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> Response<axum::body::BoxBody> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Registers `login` and returns the new user id.
    pub async fn register(&self, login: &str) -> String {
        let response = self
            .post_json(
                "/users",
                json!({
                    "login": login,
                    "email": format!("{}@example.pl", login),
                    "salt": "c2FsdA==",
                    "password_hash": "argon2id$stub",
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await["user_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Starts a top-up and returns the payment id.
    pub async fn deposit(&self, user_id: &str, amount: i64) -> String {
        let response = self
            .post_json(
                "/payments/intents",
                json!({ "user_id": user_id, "amount": amount }),
            )
            .await;
        assert_eq!(response.status(), 200);
        body_json(response).await["payment_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn deliver(&self, payload: &[u8], signature: Option<&str>) -> Response<axum::body::BoxBody> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/stripe/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        self.send(builder.body(Body::from(payload.to_vec())).unwrap())
            .await
    }

    pub async fn deliver_signed(&self, payload: &[u8]) -> Response<axum::body::BoxBody> {
        let header = sign_now(payload);
        self.deliver(payload, Some(&header)).await
    }
}

pub fn sign_now(payload: &[u8]) -> String {
    sign(WEBHOOK_SECRET, Utc::now().timestamp(), payload)
}

pub fn succeeded_event(payment_id: &str, user_id: &str, amount: i64) -> Vec<u8> {
    json!({
        "id": format!("evt_{}", payment_id),
        "object": "event",
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": payment_id,
                "object": "payment_intent",
                "amount": amount,
                "currency": "pln",
                "status": "succeeded",
                "metadata": { "user_id": user_id }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub async fn body_json(response: Response<axum::body::BoxBody>) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
