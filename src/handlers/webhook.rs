use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::gateway::STRIPE_SIGNATURE_HEADER;
use crate::AppState;

/// Receives Stripe event deliveries.
///
/// The body is taken as raw bytes: the signature covers the exact payload, so
/// it must not be re-serialized before verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            tracing::warn!("Rejected webhook: missing Stripe-Signature header");
            AppError::BadRequest("Missing Stripe-Signature header".to_string())
        })?;

    let outcome = state.reconciler.handle_event(&body, signature).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "received": true, "outcome": outcome })),
    ))
}
