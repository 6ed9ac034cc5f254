//! Postgres implementation of AccountStore.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::bounded;
use crate::domain::{Account, NewAccount};
use crate::ports::{AccountStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn create(&self, input: NewAccount) -> StoreResult<Account> {
        let account = Account::new(input);
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Account>(
                r#"
                INSERT INTO accounts (
                    user_id, login, email, salt, password_hash,
                    encrypted_balance, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(&account.user_id)
            .bind(&account.login)
            .bind(&account.email)
            .bind(&account.salt)
            .bind(&account.password_hash)
            .bind(&account.encrypted_balance)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Account> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn get_by_login(&self, login: &str) -> StoreResult<Account> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("login {}", login)))
    }

    async fn exists(&self, user_id: &str) -> StoreResult<bool> {
        bounded(
            self.op_timeout,
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM accounts WHERE user_id = $1)",
            )
            .bind(user_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_balance(&self, user_id: &str, encrypted_balance: &str) -> StoreResult<()> {
        let result = bounded(
            self.op_timeout,
            sqlx::query(
                "UPDATE accounts SET encrypted_balance = $2, updated_at = NOW() WHERE user_id = $1",
            )
            .bind(user_id)
            .bind(encrypted_balance)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        bounded(self.op_timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }
}
