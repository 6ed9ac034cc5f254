pub mod in_memory;
pub mod postgres_accounts;
pub mod postgres_ledger;

pub use in_memory::{InMemoryAccountStore, InMemoryLedgerStore};
pub use postgres_accounts::PostgresAccountStore;
pub use postgres_ledger::PostgresLedgerStore;

use std::future::Future;
use std::time::Duration;

use crate::ports::{StoreError, StoreResult};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                StoreError::Timeout("timed out acquiring a connection".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateKey(db_err.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Runs a query under a deadline. An elapsed deadline is reported as
/// `StoreError::Timeout`; the statement may still have committed.
pub(crate) async fn bounded<T, F>(deadline: Duration, query: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(deadline, query).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(format!("no response within {:?}", deadline))),
    }
}
