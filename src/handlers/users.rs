use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ports::StoreError;
use crate::validation::{validate_encrypted_balance, validate_registration};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub salt: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub login: String,
    pub email: String,
}

/// What a client needs to derive its key and prove the password locally.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeta {
    pub user_id: String,
    pub salt: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalancePayload {
    pub encrypted_balance: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = validate_registration(
        &payload.login,
        &payload.email,
        &payload.salt,
        &payload.password_hash,
    )?;
    let login = input.login.clone();

    let account = state.accounts.create(input).await.map_err(|e| match e {
        StoreError::DuplicateKey(_) => AppError::Conflict(format!("Login {} is taken", login)),
        other => other.into(),
    })?;

    tracing::info!(user_id = %account.user_id, login = %account.login, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: account.user_id,
            login: account.login,
            email: account.email,
        }),
    ))
}

pub async fn get_user_meta(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.accounts.get_by_login(login.trim()).await?;

    Ok(Json(UserMeta {
        user_id: account.user_id,
        salt: account.salt,
        password_hash: account.password_hash,
    }))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.accounts.get_by_id(&user_id).await?;

    Ok(Json(BalancePayload {
        encrypted_balance: account.encrypted_balance,
    }))
}

pub async fn update_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<BalancePayload>,
) -> Result<impl IntoResponse, AppError> {
    validate_encrypted_balance(&payload.encrypted_balance)?;

    state
        .accounts
        .update_balance(&user_id, payload.encrypted_balance.trim())
        .await?;

    tracing::debug!(user_id = %user_id, "Encrypted balance replaced");
    Ok(StatusCode::NO_CONTENT)
}
