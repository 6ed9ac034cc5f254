//! Postgres implementation of LedgerStore.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::bounded;
use crate::domain::{TransactionRecord, TransactionStatus};
use crate::ports::{effective_limit, LedgerStore, StatusChange, StoreError, StoreResult};

const RECORD_COLUMNS: &str = "transaction_id, user_id, kind, amount, currency, status, \
    description, payment_id, created_at, updated_at";

/// Postgres-backed ledger.
///
/// Uniqueness of `payment_id` is enforced by the table's unique index, and the
/// status transition is a single conditional `UPDATE`, so concurrent webhook
/// deliveries need no application-level locking.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn create_record(&self, tx: &TransactionRecord) -> StoreResult<TransactionRecord> {
        let sql = format!(
            r#"
            INSERT INTO transactions ({RECORD_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = bounded(
            self.op_timeout,
            sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(tx.transaction_id)
                .bind(&tx.user_id)
                .bind(tx.kind.as_str())
                .bind(&tx.amount)
                .bind(&tx.currency)
                .bind(tx.status.as_str())
                .bind(&tx.description)
                .bind(&tx.payment_id)
                .bind(tx.created_at)
                .bind(tx.updated_at)
                .fetch_one(&self.pool),
        )
        .await?;

        row.into_domain()
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> StoreResult<TransactionRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM transactions WHERE payment_id = $1");
        let row = bounded(
            self.op_timeout,
            sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(payment_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("payment_id {}", payment_id)))?
            .into_domain()
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> StoreResult<TransactionRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM transactions WHERE transaction_id = $1");
        let row = bounded(
            self.op_timeout,
            sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(transaction_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("transaction {}", transaction_id)))?
            .into_domain()
    }

    async fn update_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<StatusChange> {
        if status.is_terminal() {
            let sql = format!(
                r#"
                UPDATE transactions SET status = $2, updated_at = NOW()
                WHERE transaction_id = $1 AND status = 'pending'
                RETURNING {RECORD_COLUMNS}
                "#
            );
            let updated = bounded(
                self.op_timeout,
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(transaction_id)
                    .bind(status.as_str())
                    .fetch_optional(&self.pool),
            )
            .await?;

            if let Some(row) = updated {
                return Ok(StatusChange {
                    record: row.into_domain()?,
                    applied: true,
                });
            }
        }

        // Nothing moved: either the record is missing or the call is a no-op.
        Ok(StatusChange {
            record: self.find_by_id(transaction_id).await?,
            applied: false,
        })
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = bounded(
            self.op_timeout,
            sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(user_id)
                .bind(effective_limit(limit))
                .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    user_id: String,
    kind: String,
    amount: bigdecimal::BigDecimal,
    currency: String,
    status: String,
    description: String,
    payment_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<TransactionRecord> {
        Ok(TransactionRecord {
            transaction_id: self.transaction_id,
            user_id: self.user_id,
            kind: self.kind.parse().map_err(StoreError::Database)?,
            amount: self.amount,
            currency: self.currency,
            status: self.status.parse().map_err(StoreError::Database)?,
            description: self.description,
            payment_id: self.payment_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
