//! Storage ports.
//! The reconciliation logic only sees these traits; adapters live in `crate::adapters`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Account, NewAccount, TransactionRecord, TransactionStatus};

pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of `LedgerStore::update_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    /// The record as stored after the call.
    pub record: TransactionRecord,
    /// True only for the call that actually moved the status.
    pub applied: bool,
}

/// Non-positive limits fall back to [`DEFAULT_LIST_LIMIT`].
pub fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else {
        limit
    }
}

/// Persistence for ledger records.
///
/// Implementations are the serialization point for concurrent deposits and
/// duplicate webhook deliveries: `create_record` must enforce one record per
/// `payment_id`, and `update_status` must only ever move a `pending` record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_record(&self, record: &TransactionRecord) -> StoreResult<TransactionRecord>;

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<TransactionRecord>;

    async fn find_by_id(&self, transaction_id: Uuid) -> StoreResult<TransactionRecord>;

    /// Applying a status to a record that is already terminal, or already in
    /// that status, succeeds and leaves it unchanged with `applied == false`.
    /// Of several concurrent calls moving the same pending record, exactly one
    /// reports `applied`.
    async fn update_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<StatusChange>;

    /// Newest first, at most `effective_limit(limit)` entries.
    async fn list_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<TransactionRecord>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, input: NewAccount) -> StoreResult<Account>;

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Account>;

    async fn get_by_login(&self, login: &str) -> StoreResult<Account>;

    async fn exists(&self, user_id: &str) -> StoreResult<bool>;

    async fn update_balance(&self, user_id: &str, encrypted_balance: &str) -> StoreResult<()>;

    /// Cheap connectivity probe for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
