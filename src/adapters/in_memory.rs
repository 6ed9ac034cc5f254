//! In-memory store adapters.
//! Same contract as the Postgres adapters; used by tests and `serve --in-memory`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Account, NewAccount, TransactionRecord, TransactionStatus};
use crate::ports::{
    effective_limit, AccountStore, LedgerStore, StatusChange, StoreError, StoreResult,
};

#[derive(Default)]
struct LedgerState {
    records: HashMap<Uuid, TransactionRecord>,
    by_payment_id: HashMap<String, Uuid>,
    // insertion order, oldest first
    order: Vec<Uuid>,
}

/// A thread-safe in-memory ledger.
///
/// Both indexes sit behind one lock so the unique-`payment_id` check and the
/// insert happen atomically.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_record(&self, record: &TransactionRecord) -> StoreResult<TransactionRecord> {
        let mut state = self.state.write().await;

        if state.records.contains_key(&record.transaction_id) {
            return Err(StoreError::DuplicateKey(format!(
                "transaction_id {}",
                record.transaction_id
            )));
        }
        if let Some(payment_id) = &record.payment_id {
            if state.by_payment_id.contains_key(payment_id) {
                return Err(StoreError::DuplicateKey(format!("payment_id {}", payment_id)));
            }
            state
                .by_payment_id
                .insert(payment_id.clone(), record.transaction_id);
        }

        state.order.push(record.transaction_id);
        state.records.insert(record.transaction_id, record.clone());
        Ok(record.clone())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<TransactionRecord> {
        let state = self.state.read().await;
        state
            .by_payment_id
            .get(payment_id)
            .and_then(|id| state.records.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("payment_id {}", payment_id)))
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> StoreResult<TransactionRecord> {
        let state = self.state.read().await;
        state
            .records
            .get(&transaction_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", transaction_id)))
    }

    async fn update_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<StatusChange> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(&transaction_id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", transaction_id)))?;

        let applied = record.status.can_transition_to(status);
        if applied {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(StatusChange {
            record: record.clone(),
            applied,
        })
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<TransactionRecord>> {
        let limit = effective_limit(limit) as usize;
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.records.get(id))
            .filter(|record| record.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory account store keyed by `user_id`.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, input: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.login == input.login) {
            return Err(StoreError::DuplicateKey(format!("login {}", input.login)));
        }
        let account = Account::new(input);
        accounts.insert(account.user_id.clone(), account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn get_by_login(&self, login: &str) -> StoreResult<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .values()
            .find(|a| a.login == login)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("login {}", login)))
    }

    async fn exists(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.accounts.read().await.contains_key(user_id))
    }

    async fn update_balance(&self, user_id: &str, encrypted_balance: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        account.encrypted_balance = encrypted_balance.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
