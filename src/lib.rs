pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod use_cases;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::ports::AccountStore;
use crate::use_cases::Reconciler;

/// Stripe event payloads are a few KiB; anything larger is not a real delivery.
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Values the client app needs to start a card payment.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub publishable_key: String,
    pub currency: String,
}

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub accounts: Arc<dyn AccountStore>,
    pub client: ClientSettings,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", post(handlers::users::register))
        .route("/logins/:login/meta", get(handlers::users::get_user_meta))
        .route(
            "/users/:user_id/balance",
            get(handlers::users::get_balance).put(handlers::users::update_balance),
        )
        .route(
            "/users/:user_id/transactions",
            get(handlers::payments::list_transactions),
        )
        .route(
            "/payments/intents",
            post(handlers::payments::create_payment_intent),
        )
        .route("/payments/config", get(handlers::payments::payments_config))
        .route(
            "/stripe/webhook",
            post(handlers::webhook::stripe_webhook)
                .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
