use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::TransactionRecord;
use crate::error::AppError;
use crate::ports::DEFAULT_LIST_LIMIT;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub user_id: String,
    /// Minor currency units (grosze for PLN).
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<TransactionRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentsConfig {
    pub publishable_key: String,
    pub currency: String,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let intent = state
        .reconciler
        .create_deposit(&payload.user_id, payload.amount)
        .await?;

    Ok((StatusCode::OK, Json(intent)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let transactions = state.reconciler.list_transactions(&user_id, limit).await?;

    Ok(Json(TransactionList {
        total: transactions.len(),
        transactions,
    }))
}

pub async fn payments_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(PaymentsConfig {
        publishable_key: state.client.publishable_key.clone(),
        currency: state.client.currency.clone(),
    })
}
